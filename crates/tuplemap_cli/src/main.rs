//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `tuplemap_core` linkage with one create/find round trip over an
//!   in-memory store.
//! - Keep output deterministic for quick local sanity checks.

use std::rc::Rc;
use tuplemap_core::{
    open_store_in_memory, FieldType, Mapper, MapperError, MapperSource, Params, Pool, Schema,
    Space,
};

fn main() {
    println!("tuplemap_core ping={}", tuplemap_core::ping());
    println!("tuplemap_core version={}", tuplemap_core::core_version());

    match round_trip() {
        Ok(same_instance) => println!("tuplemap_core round_trip=ok identity={same_instance}"),
        Err(err) => {
            eprintln!("tuplemap_core round_trip=error error={err}");
            std::process::exit(1);
        }
    }
}

fn round_trip() -> Result<bool, MapperError> {
    let space = Space::builder(512, "probes")
        .field("id", FieldType::Unsigned)
        .field("label", FieldType::String)
        .index("primary", &["id"])
        .build()?;
    let store = open_store_in_memory()?;
    store.define_space(&space)?;
    let schema = Schema::new().with_space(space)?;

    let mut pool = Pool::new();
    pool.register("smoke", MapperSource::Direct(Mapper::new(schema, Rc::new(store))))?;

    let created = pool.create(
        "smoke.probes",
        &Params::from([("id", 1_i64)])
            .with("label", "probe")
            .into_fields()
            .unwrap_or_default(),
    )?;
    let found = pool.find_or_fail("smoke.probes", 1_i64)?;
    Ok(Rc::ptr_eq(&created, &found))
}
