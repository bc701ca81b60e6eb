//! Candle acquisition seam.
//!
//! The simulator's collaborator contract: a source must hand back candles
//! sorted ascending by timestamp with no duplicates, covering the requested
//! window. `JsonFileSource` is the fixture-backed implementation used for
//! local runs and tests; live exchange clients implement the same trait
//! elsewhere.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::TargetSpec;
use exitlab_core::domain::Candle;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no candle data for '{label}' under {dir}")]
    NotFound { label: String, dir: String },
    #[error("failed reading candle file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed parsing candle file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("candle source error: {0}")]
    Other(String),
}

/// Supplies candles for one target window. Implementations do any blocking
/// work (disk, network) here, before the simulator runs.
pub trait CandleSource: Sync {
    fn candles(&self, target: &TargetSpec) -> Result<Vec<Candle>, SourceError>;
}

/// Reads candles from `<dir>/<chain>_<mint>.json` (a JSON array of candles),
/// trims to the target window, and canonicalizes ordering.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, target: &TargetSpec) -> PathBuf {
        self.dir.join(format!("{}_{}.json", target.chain, target.mint))
    }
}

impl CandleSource for JsonFileSource {
    fn candles(&self, target: &TargetSpec) -> Result<Vec<Candle>, SourceError> {
        let path = self.path_for(target);
        if !path.exists() {
            return Err(SourceError::NotFound {
                label: target.label(),
                dir: self.dir.display().to_string(),
            });
        }
        let raw = fs::read_to_string(&path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut candles: Vec<Candle> =
            serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        candles.retain(|c| {
            c.timestamp >= target.start_timestamp && c.timestamp <= target.end_timestamp
        });
        Ok(canonicalize(candles))
    }
}

/// Sort ascending and resolve timestamp collisions: the highest-volume
/// candle wins (mixed-granularity feeds can emit the same timestamp twice).
pub fn canonicalize(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.sort_by_key(|c| c.timestamp);
    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => {
                if candle.volume > last.volume {
                    *last = candle;
                }
            }
            _ => deduped.push(candle),
        }
    }
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(timestamp: i64, close: f64, volume: f64) -> Candle {
        Candle {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn canonicalize_sorts_ascending() {
        let candles = vec![candle(300, 3.0, 1.0), candle(100, 1.0, 1.0), candle(200, 2.0, 1.0)];
        let out = canonicalize(candles);
        let timestamps: Vec<i64> = out.iter().map(|c| c.timestamp).collect();
        assert_eq!(timestamps, vec![100, 200, 300]);
    }

    #[test]
    fn collision_keeps_highest_volume() {
        let candles = vec![
            candle(100, 1.0, 500.0),
            candle(100, 1.1, 2_000.0),
            candle(100, 1.2, 100.0),
        ];
        let out = canonicalize(candles);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].close, 1.1);
        assert_eq!(out[0].volume, 2_000.0);
    }

    #[test]
    fn missing_file_is_not_found() {
        let source = JsonFileSource::new("/nonexistent-candle-dir");
        let target = TargetSpec {
            mint: "abc".into(),
            chain: "solana".into(),
            start_timestamp: 0,
            end_timestamp: 1,
        };
        assert!(matches!(
            source.candles(&target),
            Err(SourceError::NotFound { .. })
        ));
    }

    mod canonicalize_props {
        use super::*;
        use proptest::prelude::*;

        fn arb_candles() -> impl Strategy<Value = Vec<Candle>> {
            prop::collection::vec(
                (0i64..50, 0.1f64..10.0, 1.0f64..100_000.0)
                    .prop_map(|(timestamp, close, volume)| candle(timestamp, close, volume)),
                0..64,
            )
        }

        proptest! {
            #[test]
            fn output_is_strictly_ascending(candles in arb_candles()) {
                let out = canonicalize(candles);
                for pair in out.windows(2) {
                    prop_assert!(pair[0].timestamp < pair[1].timestamp);
                }
            }

            #[test]
            fn every_survivor_wins_its_timestamp_by_volume(candles in arb_candles()) {
                let out = canonicalize(candles.clone());
                // One survivor per distinct timestamp, and none out-volumed
                // by a dropped candle at the same timestamp.
                let mut distinct: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
                distinct.sort_unstable();
                distinct.dedup();
                prop_assert_eq!(out.len(), distinct.len());
                for survivor in &out {
                    for original in &candles {
                        if original.timestamp == survivor.timestamp {
                            prop_assert!(original.volume <= survivor.volume);
                        }
                    }
                }
            }
        }
    }
}
