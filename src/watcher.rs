use std::collections::HashSet;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::intake::{Intake, Warmup};

pub type EventReceiver = UnboundedReceiver<notify::Result<Event>>;

/// Spawns one detached task per arrived file.
///
/// A path already being handled is not dispatched again, so the several
/// events one rename produces lead to a single intake. With a limit set,
/// tasks still spawn immediately but wait for a permit before touching
/// the file.
#[derive(Clone)]
pub struct Dispatcher {
    intake: Arc<Intake>,
    permits: Option<Arc<Semaphore>>,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

/// Releases the in-flight claim on a path when its task ends.
struct InFlight {
    set: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.path);
        }
    }
}

impl Dispatcher {
    pub fn new(intake: Arc<Intake>, limit: Option<usize>) -> Self {
        Self {
            intake,
            permits: limit.map(|n| Arc::new(Semaphore::new(n))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Returns `None` when `path` is already being handled.
    pub fn dispatch(&self, path: PathBuf) -> Option<JoinHandle<()>> {
        let claimed = match self.in_flight.lock() {
            Ok(mut set) => set.insert(path.clone()),
            Err(_) => true,
        };
        if !claimed {
            debug!("{} is already in progress", path.display());
            return None;
        }
        let guard = InFlight { set: self.in_flight.clone(), path: path.clone() };
        let intake = self.intake.clone();
        let permits = self.permits.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            let _permit = match permits {
                Some(sem) => match sem.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };
            intake.intake(&path, Warmup::Settle).await;
        }))
    }
}

fn subscription_error(dir: &Path, reason: impl ToString) -> AppError {
    AppError::WatcherSubscription { path: dir.to_path_buf(), reason: reason.to_string() }
}

/// Starts watching `dir` (not its subdirectories).
///
/// The returned watcher must be kept alive for as long as events are wanted.
pub fn subscribe(dir: &Path) -> Result<(RecommendedWatcher, EventReceiver), AppError> {
    let (tx, rx) = unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })
    .map_err(|e| subscription_error(dir, e))?;
    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .map_err(|e| subscription_error(dir, e))?;
    info!("Watching {}", dir.display());
    Ok((watcher, rx))
}

/// Paths that just appeared in the folder: created, or renamed/moved in.
///
/// A paired rename carries `[from, to]`; only the destination counts.
pub fn arrived_paths(event: Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event.paths.into_iter().last().into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Dispatches every arrived path until the subscription fails.
///
/// Only returns on a watcher-level error or when the event stream closes,
/// both of which are fatal.
pub async fn watch_loop(dir: &Path, mut events: EventReceiver, dispatcher: &Dispatcher) -> Result<Infallible, AppError> {
    while let Some(res) = events.recv().await {
        let event = res.map_err(|e| subscription_error(dir, e))?;
        debug!("event: {:?}", event);
        for path in arrived_paths(event) {
            dispatcher.dispatch(path);
        }
    }
    Err(subscription_error(dir, "event stream closed"))
}
