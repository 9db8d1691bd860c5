use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::error::PersistError;
use crate::model::{Tree, TreeSummary};
use crate::persist::{PersistenceAdapter, content_hash};

type Reply<T> = Sender<Result<T, PersistError>>;

enum Command {
    Save(Box<Tree>),
    Delete(String),
    Load { tree_id: String, reply: Reply<Option<Tree>> },
    List { owner_id: String, reply: Reply<Vec<TreeSummary>> },
    Flush(Sender<()>),
}

// Failures are logged and never undo local state.
pub struct RemoteSync {
    tx: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    owner_id: String,
    submitted: HashMap<String, String>,
}

impl RemoteSync {
    pub fn spawn<A>(adapter: A, owner_id: impl Into<String>) -> Result<Self, PersistError>
    where
        A: PersistenceAdapter + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("kinship-remote".to_string())
            .spawn(move || run_worker(adapter, rx))?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            owner_id: owner_id.into(),
            submitted: HashMap::new(),
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn submit(&mut self, tree: &Tree) -> bool {
        let hash = content_hash(tree);
        if self.submitted.get(&tree.id) == Some(&hash) {
            return false;
        }
        if !self.send(Command::Save(Box::new(tree.clone()))) {
            return false;
        }
        self.submitted.insert(tree.id.clone(), hash);
        true
    }

    pub fn delete(&mut self, tree_id: &str) {
        self.submitted.remove(tree_id);
        self.send(Command::Delete(tree_id.to_string()));
    }

    pub fn load(&self, tree_id: &str) -> Result<Option<Tree>, PersistError> {
        let (reply, rx) = mpsc::channel();
        if !self.send(Command::Load {
            tree_id: tree_id.to_string(),
            reply,
        }) {
            return Err(PersistError::Disconnected);
        }
        rx.recv().map_err(|_| PersistError::Disconnected)?
    }

    pub fn list(&self) -> Result<Vec<TreeSummary>, PersistError> {
        let (reply, rx) = mpsc::channel();
        if !self.send(Command::List {
            owner_id: self.owner_id.clone(),
            reply,
        }) {
            return Err(PersistError::Disconnected);
        }
        rx.recv().map_err(|_| PersistError::Disconnected)?
    }

    pub fn flush(&self) {
        let (done, rx) = mpsc::channel();
        if self.send(Command::Flush(done)) {
            let _ = rx.recv();
        }
    }

    fn send(&self, command: Command) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        if tx.send(command).is_err() {
            warn!("remote worker is gone; dropping request");
            return false;
        }
        true
    }
}

impl Drop for RemoteSync {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("remote worker panicked");
            }
        }
    }
}

fn run_worker<A: PersistenceAdapter>(adapter: A, rx: Receiver<Command>) {
    let mut pending: Option<Command> = None;
    loop {
        let command = match pending.take() {
            Some(command) => command,
            None => match rx.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            Command::Save(tree) => {
                let mut latest = tree;
                let mut skipped = 0usize;
                loop {
                    match rx.try_recv() {
                        Ok(Command::Save(next)) if next.id == latest.id => {
                            latest = next;
                            skipped += 1;
                        }
                        Ok(other) => {
                            pending = Some(other);
                            break;
                        }
                        Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                    }
                }
                if skipped > 0 {
                    debug!(tree = %latest.id, skipped, "coalesced queued saves");
                }
                if let Err(err) = adapter.save_snapshot(&latest) {
                    warn!(tree = %latest.id, error = %err, "remote save failed");
                }
            }
            Command::Delete(tree_id) => {
                if let Err(err) = adapter.delete_snapshot(&tree_id) {
                    warn!(tree = %tree_id, error = %err, "remote delete failed");
                }
            }
            Command::Load { tree_id, reply } => {
                let _ = reply.send(adapter.load_snapshot(&tree_id));
            }
            Command::List { owner_id, reply } => {
                let _ = reply.send(adapter.list_snapshots(&owner_id));
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
