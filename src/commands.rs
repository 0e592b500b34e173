use crate::cli::Command;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{BufReader, stdin};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use vcache_config::Config;
use vcache_keys::{GarbleDetector, KEY_LENGTH, compute_key, decode};
use vcache_request::{DEFAULT_BUFFER_SIZE, ProxiedTarget, extract_resource_url};
use vcache_storage::{CacheInfo, lru_entries, recursive_size, trim_to_budget, try_recursive_delete};

pub(crate) fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Key { url } => println!("{}", compute_key(url)),
        Command::Info { resource } => info(config, &resource)?,
        Command::Lru => lru(config)?,
        Command::Size { path } => {
            let size = match path {
                Some(path) => recursive_size(&path),
                None => cache_size(&cache_dir(config)?),
            };
            println!("{size}");
        },
        Command::Evict { max_size } => {
            let report = trim_to_budget(&cache_dir(config)?, max_size.unwrap_or(config.max_cache_size));
            for path in &report.removed {
                println!("removed\t{}", path.display());
            }
            for path in &report.failed {
                println!("failed\t{}", path.display());
            }
            println!("freed {} bytes, {} bytes remaining", report.freed, report.remaining);
        },
        Command::Purge { resource } => {
            let dir = cache_dir(config)?.join(resource_key(&resource));
            if !dir.exists() {
                exn::bail!(ErrorKind::NotCached(resource));
            }
            try_recursive_delete(&dir).or_raise(|| ErrorKind::Storage)?;
            println!("purged {}", dir.display());
        },
        Command::Request => {
            let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stdin().lock());
            let path = extract_resource_url(reader).or_raise(|| ErrorKind::Request)?;
            let target = ProxiedTarget::parse(&path);
            println!("path\t{path}");
            println!("url\t{}", target.url);
            if let Some(extra) = &target.extra {
                println!("extra\t{extra}");
            }
            println!("key\t{}", target.cache_key());
            println!("name\t{}", display_name(&target.url, &config.garble_detector()));
        },
        Command::Garbled { text } => {
            let detector = config.garble_detector();
            match detector.noise_ratio(&text) {
                Some(ratio) => println!("{}\t(noise {ratio:.2}, threshold {})", detector.is_garbled(&text), detector.threshold()),
                None => println!("false\t(nothing to classify)"),
            }
        },
    }
    Ok(())
}

fn cache_dir(config: &Config) -> Result<std::path::PathBuf> {
    config.cache_dir().or_raise(|| ErrorKind::Config)
}

/// Total size of the cache, as eviction accounts for it.
fn cache_size(root: &Path) -> u64 {
    lru_entries(root).iter().map(|entry| entry.size).sum()
}

/// Accept either a cache key or the URL it derives from.
fn resource_key(resource: &str) -> String {
    match resource.len() == KEY_LENGTH && resource.chars().all(|c| c.is_ascii_hexdigit()) {
        true => resource.to_ascii_lowercase(),
        false => compute_key(resource),
    }
}

/// Human-friendly name for a resource: the last segment of its URL path if it
/// decodes to readable text, otherwise its cache key.
fn display_name(url: &str, detector: &GarbleDetector) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or_default();
    match decode(segment) {
        Some(name) if !name.is_empty() && !detector.is_garbled(&name) => name,
        _ => compute_key(url),
    }
}

fn info(config: &Config, resource: &str) -> Result<()> {
    let dir = cache_dir(config)?.join(resource_key(resource));
    let info: CacheInfo = match config.metadata_store().try_load(&dir).or_raise(|| ErrorKind::Storage)? {
        Some(info) => info,
        None => exn::bail!(ErrorKind::NotCached(resource.to_string())),
    };
    let json = serde_json::to_string_pretty(&info).or_raise(|| ErrorKind::Output)?;
    println!("{json}");
    println!("size\t{}", recursive_size(&dir));
    Ok(())
}

fn lru(config: &Config) -> Result<()> {
    let root = cache_dir(config)?;
    let store = config.metadata_store();
    for entry in lru_entries(&root) {
        let modified = entry.modified.format(&Rfc3339).or_raise(|| ErrorKind::Output)?;
        let url = describe(&store, &entry.path).unwrap_or_default();
        println!("{modified}\t{}\t{}\t{url}", entry.size, entry.path.display());
    }
    Ok(())
}

fn describe(store: &vcache_storage::MetadataStore, dir: &Path) -> Option<String> {
    match dir.is_dir() {
        true => store.load::<CacheInfo>(dir).map(|info| info.resource_url),
        false => None,
    }
}
