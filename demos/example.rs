use rigging::{DirectoryPlan, Loader, Schema};

fn main() -> Result<(), rigging::Error> {
    let schema = Schema::builder("BundleJob")
        .setting("region", "us-east-1")
        .setting("compress", true)
        .required_field("bucket")
        .nested("retries", |retries| {
            retries.setting("attempts", 3).setting("backoff_ms", 250)
        })
        .build();

    let job = schema.instantiate();

    // defaults -> optional local file -> env overrides
    Loader::new()
        .with_file("demos/job.toml", false)
        .with_env("BUNDLE", "__")
        .apply(&job)?;

    job.set("bucket", "releases")?;
    job.check_required()?;

    println!("job: {job:?}");
    if let Some(region) = job.get("region")?.as_str() {
        println!("region: {region}");
    }

    let workspace = DirectoryPlan::builder("Workspace")
        .dir_at("workdir", "bundle_workdir", |d| {
            d.path_at("manifest", "image.manifest.xml")
                .dir_at("credentials", "aws-creds", |d| {
                    d.path_at("certificate", "cert.pem")
                })
        })
        .build()
        .instantiate();

    workspace.root().set_absolute_path("/tmp");
    workspace.resolve_paths();
    workspace.check_required()?;

    println!(
        "certificate: {}",
        workspace.node("certificate")?.absolute_path()?
    );

    Ok(())
}
