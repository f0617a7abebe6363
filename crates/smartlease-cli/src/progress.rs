//! Progress reporting on stderr

use std::io::{self, Write};
use std::time::Instant;

/// Progress line for batch embedding
pub struct ProgressReporter {
    enabled: bool,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started: Instant::now(),
        }
    }

    pub fn update(&self, done: usize, total: usize) {
        if !self.enabled {
            return;
        }
        eprint!("\r{:<60}", progress_line(done, total, self.started.elapsed().as_secs_f64()));
        io::stderr().flush().ok();
    }

    pub fn finish(&self) {
        if self.enabled {
            eprintln!();
        }
    }
}

fn progress_line(done: usize, total: usize, elapsed_secs: f64) -> String {
    let pct = if total > 0 { done * 100 / total } else { 100 };
    let eta = if done > 0 && done < total {
        let remaining = elapsed_secs / done as f64 * (total - done) as f64;
        format!(", ~{:.0}s left", remaining)
    } else {
        String::new()
    };
    format!("Embedding: {}/{} ({}%{})", done, total, pct, eta)
}
