//! Alias resolution and atomic retargeting.

use tracing::{info, warn};

use crate::engine::{AliasAction, SearchEngine};
use crate::error::EngineError;

/// Index an alias currently points to, if any.
pub async fn resolve_alias<E: SearchEngine>(
    engine: &E,
    alias: &str,
) -> Result<Option<String>, EngineError> {
    let mut targets = engine.alias_targets(alias).await?;
    targets.sort();
    if targets.len() > 1 {
        warn!(alias, ?targets, "Alias points to several indices, using the first one.");
    }
    Ok(targets.into_iter().next())
}

/// Point `alias` at `index` and return the index it pointed to before.
///
/// The add and the remove travel in the same `_aliases` request so readers
/// never see the alias unbound. Returns `None` when the alias did not exist or
/// already pointed at `index`; in the latter case nothing is sent.
pub async fn retarget_alias<E: SearchEngine>(
    engine: &E,
    alias: &str,
    index: &str,
) -> Result<Option<String>, EngineError> {
    match resolve_alias(engine, alias).await? {
        None => {
            info!(alias, index, "Creating alias.");
            engine
                .update_aliases(&[AliasAction::add(index, alias)])
                .await?;
            Ok(None)
        }
        Some(current) if current == index => {
            info!(alias, index, "Alias already points to index.");
            Ok(None)
        }
        Some(previous) => {
            info!(alias, index, previous = %previous, "Moving alias.");
            engine
                .update_aliases(&[
                    AliasAction::add(index, alias),
                    AliasAction::remove(&previous, alias),
                ])
                .await?;
            Ok(Some(previous))
        }
    }
}
