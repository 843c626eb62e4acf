//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `shareable_core` linkage with one shared collection round trip.
//! - Keep output deterministic for quick local sanity checks.

use shareable_core::{
    default_log_level, init_logging, CollectionManager, ColumnBatch, ManagerOptions, Value,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Some(log_dir) = std::env::args().nth(1) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }
    println!("shareable_core version={}", shareable_core::core_version());

    let creator = CollectionManager::new(ManagerOptions::default());
    let joiner = CollectionManager::new(ManagerOptions::default());
    println!("creator state={}", creator.bind_name("smoke").as_str());
    println!("joiner state={}", joiner.bind_name("smoke").as_str());

    let ids = creator.add_designators(&["name", "count"]);
    if ids.len() != 2 {
        eprintln!("designators were not registered");
        return ExitCode::FAILURE;
    }

    let mut columns = ColumnBatch::new();
    columns.insert(ids[0], vec![Value::from("alpha"), Value::from("beta")]);
    columns.insert(ids[1], vec![Value::Integer(1), Value::Integer(2)]);
    let data = joiner.add_data(&columns);
    println!("rows added={data:?}");

    for row in creator.get_data_of(&ids) {
        println!("row={row:?}");
    }
    log::info!("event=cli_smoke module=cli status=ok rows={}", data.len());
    ExitCode::SUCCESS
}
