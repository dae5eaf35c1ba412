//! Terminal keyboard watcher: reads single bytes from stdin on a named
//! thread and forwards mapped commands over a bounded channel.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};

use super::router::{self, KeyCommand};

pub struct KeyWatcher {
    stop: Arc<AtomicBool>,
}

impl KeyWatcher {
    /// Spawn the stdin reader. Returns the watcher handle and the command
    /// receiver. `wake` is pinged after each queued command so the event
    /// loop drains promptly.
    pub fn spawn(
        wake: impl Fn() + Send + 'static,
    ) -> anyhow::Result<(Self, Receiver<KeyCommand>)> {
        let (tx, rx): (Sender<KeyCommand>, Receiver<KeyCommand>) = crossbeam_channel::bounded(16);
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        std::thread::Builder::new()
            .name("tapdeck-keys".into())
            .spawn(move || {
                let mut stdin = std::io::stdin().lock();
                let mut buf = [0u8; 1];
                while !flag.load(Ordering::Relaxed) {
                    match stdin.read(&mut buf) {
                        Ok(0) => break, // EOF
                        Ok(_) => {
                            if let Some(command) = router::map_key(buf[0]) {
                                let _ = tx.try_send(command); // drop if full
                                wake();
                            }
                        }
                        Err(e) => {
                            log::warn!("keyboard read error: {e}");
                            break;
                        }
                    }
                }
                log::debug!("keyboard watcher exiting");
            })?;

        Ok((Self { stop }, rx))
    }

    /// Detach the watcher. The thread stops forwarding once its current
    /// blocking read returns; commands already queued stay readable.
    pub fn detach(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for KeyWatcher {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Interactive help, printed on 'h'.
pub fn print_help() {
    println!();
    println!("Interactive mode - keyboard controls:");
    println!();
    println!("\tp:   Pause/Play");
    println!("\tq:   quit");
    println!();
}
