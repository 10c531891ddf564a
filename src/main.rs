//! Reactive Cache - demo binary
//!
//! Builds a small people directory on top of a record-backed store and a
//! plain store, drives it through one consumer scope, and prints the store
//! statistics as JSON.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reactive_cache::{
    define_record_store, define_store, flush, init_global_default_options, reactive_fields,
    CacheStore, Computed, Config, Ref, RecordStoreSpec, Scope, WeakCacheStore,
};

#[derive(Debug, Clone)]
struct PersonRecord {
    id: u32,
    name: String,
    friend: Option<u32>,
}

/// Cached view of one person.
struct Person {
    id: u32,
    name: Ref<String>,
    greeting: Computed<String>,
    friend: Option<u32>,
    directory: WeakCacheStore<u32, Person>,
}

reactive_fields!(Person {
    id,
    name,
    greeting,
    friend,
    directory
});

impl Person {
    fn friend_name(&self) -> Option<String> {
        let directory = self.directory.upgrade()?;
        let friend = directory.get(&self.friend?).ok()?;
        let name = friend.with(|person| person.name.get());
        Some(name)
    }
}

fn seed() -> Vec<PersonRecord> {
    vec![
        PersonRecord {
            id: 1,
            name: "Ada".into(),
            friend: Some(2),
        },
        PersonRecord {
            id: 2,
            name: "Grace".into(),
            friend: Some(1),
        },
        PersonRecord {
            id: 3,
            name: "Edsger".into(),
            friend: None,
        },
    ]
}

fn main() -> Result<()> {
    // Defaults to "reactive_cache=info", can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reactive_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    init_global_default_options(config.default_options());
    info!(
        auto_mount_and_unmount = config.auto_mount_and_unmount,
        auto_clear_unused = config.auto_clear_unused,
        "configuration loaded"
    );

    let records = Ref::new(seed());
    let source = records.clone();
    let people = define_record_store(RecordStoreSpec::new(
        move |id: &u32| source.with(|all| all.iter().find(|r| r.id == *id).cloned()),
        |record: PersonRecord, store: &CacheStore<u32, Person>| {
            let name = Ref::new(record.name);
            let shown = name.clone();
            Person {
                id: record.id,
                greeting: Computed::new(move || format!("Hello, {}!", shown.get())),
                name,
                friend: record.friend,
                directory: store.downgrade(),
            }
        },
    ));
    let directory = people.create();

    for id in [1, 2, 3] {
        let person = directory
            .get(&id)
            .with_context(|| format!("loading person {id}"))?;
        person.with(|p| {
            info!(
                id = p.id,
                greeting = %p.greeting.get(),
                friend = ?p.friend_name(),
                "person loaded"
            );
        });
    }

    let refs = directory.get_refs(&1).context("projecting person 1")?;
    if let Some(name) = refs.get::<String>("name") {
        name.set("Augusta Ada".into());
    }
    let greeting = directory.get(&1)?.with(|p| p.greeting.get());
    info!(fields = ?refs.keys(), %greeting, "renamed through projected field");

    records.update(|all| all.retain(|r| r.id != 3));
    flush();
    info!(ids = ?directory.ids(), "record 3 removed from source");

    let scope = Scope::new();
    let lengths = scope.run(|| {
        define_store(|word: &String, _: &CacheStore<String, usize>| word.chars().count()).create()
    });
    for word in ["reactive", "cache", "reactive"] {
        lengths.get(&word.to_string())?;
    }
    info!(use_count = lengths.use_count(), ids = ?lengths.ids(), "word lengths cached");
    scope.unmount();
    info!(ids = ?lengths.ids(), "scope unmounted");

    let stats = serde_json::to_string_pretty(&directory.stats())
        .context("serializing directory stats")?;
    println!("{stats}");

    Ok(())
}
