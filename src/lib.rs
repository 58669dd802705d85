//! Tofes: places fillable AcroForm fields on Hebrew (RTL) PDF forms.
//!
//! A vision model describes which fields a page has; OCR says where the text
//! is. [`pipeline::positioning::FormPositioningEngine`] fuses the two into
//! validated, non-overlapping, tab-ordered field geometry for a PDF writer.

pub mod config;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` overrides the default filter. Calling this twice, or after the
/// host application installed its own subscriber, is a no-op.
pub fn init_tracing() {
    let initialized = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);
    }
}
