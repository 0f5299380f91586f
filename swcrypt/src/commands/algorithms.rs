//! Algorithm listing command

use console::style;
use swcrypt_core::registry::key_pair_type_names;
use swcrypt_core::{HASH_ALGORITHMS, Platform};

use crate::utils::{add_table_row, create_table};

/// Print the hash algorithms and key-pair types known to the registry
pub fn execute(platform: Platform) {
    println!("Hash algorithms ({} platform):", platform);

    let mut table = create_table(vec!["Name", "Identifier", "Provider", "Legacy", "Available"]);
    for descriptor in HASH_ALGORITHMS {
        let legacy_safe = descriptor.is_legacy_safe();
        let available = !platform.is_legacy() || legacy_safe;
        add_table_row(
            &mut table,
            vec![
                descriptor.name.to_string(),
                format!("{:#06X}", descriptor.algorithm_id.0),
                descriptor.provider_type.name().to_string(),
                yes_no(legacy_safe),
                yes_no(available),
            ],
        );
    }
    table.printstd();

    println!();
    println!("Key pair types: {}", key_pair_type_names().join(", "));

    if platform.is_legacy() {
        println!();
        println!(
            "{}",
            style("Legacy platforms only support hash algorithms up to SHA-1.").yellow()
        );
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}
