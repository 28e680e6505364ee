mod cal;
mod ipc;
mod store;

use std::io::{self, BufRead, Write};

fn main() {
    // Stdout carries the wire protocol; diagnostics go to stderr only.
    pretty_env_logger::init_custom_env("CAMPUSD_LOG");
    log::info!("campusd {} starting", env!("CARGO_PKG_VERSION"));

    let mut state = ipc::AppState { session: None };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply with an id we never parsed.
                log::warn!("unparseable request line: {}", e);
                let _ = writeln!(
                    stdout,
                    "{{\"ok\":false,\"error\":{{\"code\":\"bad_json\",\"message\":\"{}\"}}}}",
                    e
                );
                let _ = stdout.flush();
                continue;
            }
        };

        log::debug!("dispatch {} ({})", req.method, req.id);
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
