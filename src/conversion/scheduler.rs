use std::collections::{BTreeMap, VecDeque};

use log::{debug, trace};

use crate::conversion::error::ConversionError;

/// Buckets of deferred work. Every item of a phase runs before any item of a later phase.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    ResolveReferences = 0,
    RigSetup = 1,
    AvatarSetup = 2,
    EnableRig = 3,
    PostProcess = 4,
    AwaitExternalLoad = 5,
    Finalize = 6,
    BeforePackaging = 7,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::ResolveReferences,
        Phase::RigSetup,
        Phase::AvatarSetup,
        Phase::EnableRig,
        Phase::PostProcess,
        Phase::AwaitExternalLoad,
        Phase::Finalize,
        Phase::BeforePackaging,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }
}

pub struct PhaseScheduler<W> {
    queues: BTreeMap<Phase, VecDeque<W>>,
    current: Option<Phase>,
}

impl<W> Default for PhaseScheduler<W> {
    fn default() -> Self {
        Self {
            queues: BTreeMap::new(),
            current: None,
        }
    }
}

impl<W> PhaseScheduler<W> {
    pub fn new() -> Self {
        PhaseScheduler::default()
    }

    /// Appends to the phase's queue. Once the run has reached a phase, only later phases accept work.
    pub fn defer(&mut self, phase: Phase, work: W) -> Result<(), ConversionError> {
        if let Some(current) = self.current {
            if phase <= current {
                return Err(ConversionError::PhaseAlreadyDrained {
                    requested: phase,
                    current,
                });
            }
        }

        self.queues.entry(phase).or_default().push_back(work);
        Ok(())
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.current
    }

    pub fn pending(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Takes the oldest item of the lowest non-empty phase.
    pub fn next(&mut self) -> Option<(Phase, W)> {
        let (&phase, queue) = self.queues.iter_mut().find(|(_, queue)| !queue.is_empty())?;
        let work = queue.pop_front()?;

        if self.current != Some(phase) {
            debug!("Entering phase {:?} ({})", phase, phase.number());
            self.current = Some(phase);
        }

        Some((phase, work))
    }
}

/// Whatever owns a scheduler and can carry out its work items.
#[allow(async_fn_in_trait)]
pub trait PhaseExecutor {
    type Work: std::fmt::Debug;

    fn scheduler(&mut self) -> &mut PhaseScheduler<Self::Work>;

    async fn execute(&mut self, phase: Phase, work: Self::Work) -> Result<(), ConversionError>;

    /// Hands control back to the runtime until its next tick boundary.
    async fn tick(&mut self);
}

/// Drains every phase in order, ticking between items. The first error aborts the run, the items
/// still queued are dropped with the scheduler.
pub async fn run_all<E: PhaseExecutor>(executor: &mut E) -> Result<usize, ConversionError> {
    let mut executed = 0;

    while let Some((phase, work)) = executor.scheduler().next() {
        trace!("{:?}: {:?}", phase, work);
        executor.execute(phase, work).await?;
        executor.tick().await;
        executed += 1;
    }

    Ok(executed)
}
