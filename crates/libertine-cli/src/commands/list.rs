use super::{colorize_status, json_pretty, registry_err, EXIT_SUCCESS};
use libertine_store::RegistryStore;

pub fn run(store: &RegistryStore, json: bool) -> Result<u8, String> {
    let registry = store.load().map_err(registry_err)?;
    if json {
        println!("{}", json_pretty(&registry)?);
    } else if registry.container_list.is_empty() {
        println!("no containers found");
    } else {
        println!(
            "{:<18} {:<20} {:<10} {:<10} DEFAULT",
            "ID", "NAME", "DISTRO", "STATUS"
        );
        for container in &registry.container_list {
            let marker = if registry.default_container == *container.id.as_str() {
                "*"
            } else {
                ""
            };
            println!(
                "{:<18} {:<20} {:<10} {:<10} {}",
                container.id,
                container.name,
                container.distro,
                colorize_status(&container.install_status.to_string()),
                marker
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
