pub mod probe;
pub mod probe_set;
pub mod result;

pub mod prelude {
    pub use super::probe::Prober;
    pub use super::probe_set::ProbeSet;
    pub use super::result::{Host, ProbeResult, ProbeVariant};
}

use std::fmt::Write;

/// Render an error together with its chain of sources.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, "\n\nCaused by: {}", src);
        err = src;
    }
    s
}
