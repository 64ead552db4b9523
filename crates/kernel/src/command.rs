//! Cross-thread mutation requests.
//!
//! Other threads never touch the world directly; they send [`WorldCommand`]s
//! that the tick thread drains at the start of each tick.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use locus_common::{Direction, EntityId, Position};

use crate::entity::{Entity, Role};

/// A deferred world mutation.
#[derive(Debug)]
pub enum WorldCommand {
    /// Register an entity, optionally placing it on a map.
    Spawn {
        entity: Entity,
        placement: Option<(String, Position)>,
    },
    Place {
        map: String,
        pos: Position,
        id: EntityId,
    },
    Remove {
        map: String,
        pos: Position,
    },
    Move {
        id: EntityId,
        dir: Direction,
    },
    Delete {
        id: EntityId,
    },
    SetHealth {
        id: EntityId,
        health: i32,
        max: Option<i32>,
    },
    ModifyHealth {
        id: EntityId,
        delta: i32,
    },
    AddRole {
        id: EntityId,
        role: Role,
    },
    RemoveRole {
        id: EntityId,
        role: Role,
    },
    /// Resume ticking. Only takes effect when the host applies commands
    /// explicitly, since a stopped world does not drain its queue.
    Start,
    /// Stop the world. The tick that drains this command ends before the
    /// counter advances.
    Stop,
}

/// Cloneable handle for submitting commands from any thread.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<WorldCommand>,
}

impl CommandSender {
    /// Queue a command. Returns false once the world has been dropped.
    pub fn send(&self, command: WorldCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// Unbounded MPSC queue owned by the world.
#[derive(Debug)]
pub struct CommandQueue {
    tx: Sender<WorldCommand>,
    rx: Receiver<WorldCommand>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Everything queued so far, in submission order per sender.
    pub fn drain(&self) -> Vec<WorldCommand> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(command) => out.push(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_commands_in_order() {
        let queue = CommandQueue::new();
        let tx = queue.sender();
        assert!(tx.send(WorldCommand::Delete { id: EntityId(1) }));
        assert!(tx.send(WorldCommand::Stop));
        assert_eq!(queue.pending(), 2);

        let drained = queue.drain();
        assert!(matches!(drained[0], WorldCommand::Delete { id: EntityId(1) }));
        assert!(matches!(drained[1], WorldCommand::Stop));
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn senders_work_across_threads() {
        let queue = CommandQueue::new();
        std::thread::scope(|s| {
            for t in 0..4u64 {
                let tx = queue.sender();
                s.spawn(move || {
                    for i in 0..25 {
                        tx.send(WorldCommand::ModifyHealth {
                            id: EntityId(t + 1),
                            delta: i,
                        });
                    }
                });
            }
        });
        assert_eq!(queue.drain().len(), 100);
    }

    #[test]
    fn send_fails_after_queue_dropped() {
        let queue = CommandQueue::new();
        let tx = queue.sender();
        drop(queue);
        assert!(!tx.send(WorldCommand::Stop));
    }
}
