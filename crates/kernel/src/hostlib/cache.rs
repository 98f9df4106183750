//! Cache capability: get/set/delete with transparent per-plugin key prefix.

use std::time::Duration;

use anyhow::Result;
use wasmtime::Linker;

use crate::cache::CacheError;
use crate::plugin::PluginState;
use crate::wire::{
    CacheDeleteRequest, CacheDeleteResponse, CacheGetRequest, CacheGetResponse, CacheSetRequest,
    CacheSetResponse,
};

use super::convert::backend;
use super::{register_op, CallScope};

pub(crate) fn register_cache(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "cache",
        "get",
        |scope: CallScope, req: CacheGetRequest| {
            Box::pin(async move {
                let key = format!("{}{}", scope.cache_prefix, req.key);
                match scope.services.cache.get(&key).await {
                    Ok(value) => Ok(CacheGetResponse { value, found: true }),
                    // A miss is an answer, not an error.
                    Err(CacheError::NotFound) => Ok(CacheGetResponse::default()),
                    Err(err) => Err(backend(err)),
                }
            })
        },
    )?;

    register_op(
        linker,
        "cache",
        "set",
        |scope: CallScope, req: CacheSetRequest| {
            Box::pin(async move {
                let key = format!("{}{}", scope.cache_prefix, req.key);
                let ttl = if req.ttl_seconds > 0 {
                    Some(Duration::from_secs(req.ttl_seconds))
                } else {
                    None
                };

                match scope.services.cache.set(&key, req.value, ttl).await {
                    Ok(()) => Ok(CacheSetResponse {
                        success: true,
                        error: None,
                    }),
                    Err(err) => Ok(CacheSetResponse {
                        success: false,
                        error: Some(err.to_string()),
                    }),
                }
            })
        },
    )?;

    register_op(
        linker,
        "cache",
        "delete",
        |scope: CallScope, req: CacheDeleteRequest| {
            Box::pin(async move {
                let key = format!("{}{}", scope.cache_prefix, req.key);
                let success = !matches!(
                    scope.services.cache.delete(&key).await,
                    Err(CacheError::Backend(_))
                );

                Ok(CacheDeleteResponse { success })
            })
        },
    )?;

    Ok(())
}
