use super::practice::SessionPhase;

/// Snapshot of a practice run for rendering after each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub phase: SessionPhase,
    pub total: usize,
    /// Zero-based position of the current problem.
    pub index: usize,
    pub answered: usize,
    pub remaining: usize,
    pub hearts: u8,
    pub xp: u32,
    pub streak: u32,
}
