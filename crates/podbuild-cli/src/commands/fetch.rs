use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use podbuild_store::{default_cache_root, FetchRequest, PodCache, StoreError};
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct FetchArgs {
    pub url: String,
    pub checksum: Option<String>,
    pub sub_dir: Option<String>,
    pub into: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub offline: bool,
}

fn store_err(e: StoreError) -> String {
    format!("store error: {e}")
}

pub fn run(args: &FetchArgs, json: bool) -> Result<u8, String> {
    let root = match &args.cache_dir {
        Some(dir) => dir.clone(),
        None => default_cache_root().map_err(store_err)?,
    };
    let cache = PodCache::open(&root).map_err(store_err)?;

    let request = FetchRequest {
        url: args.url.clone(),
        checksum: args.checksum.clone(),
        offline: args.offline,
    };
    let pb = if json { None } else { Some(spinner("fetching...")) };
    let progress = |msg: &str| {
        if let Some(pb) = &pb {
            pb.set_message(msg.to_owned());
        }
    };

    let result = cache
        .fetch(&request, &progress)
        .and_then(|entry| {
            let dest = cache.export(&entry.key, args.sub_dir.as_deref(), &args.into)?;
            Ok((entry, dest))
        });
    let (entry, dest) = match result {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "fetched");
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "fetch failed");
            }
            return Err(store_err(e));
        }
    };

    if json {
        let payload = serde_json::json!({
            "url": entry.url,
            "key": entry.key,
            "checksum": entry.checksum,
            "archive": entry.archive,
            "bytes": entry.bytes,
            "fetched_at": entry.fetched_at,
            "into": dest,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{} -> {}", entry.url, dest.display());
        println!("checksum: {}", entry.checksum);
    }
    Ok(EXIT_SUCCESS)
}
