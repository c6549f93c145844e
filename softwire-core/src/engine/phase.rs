//! Engine phases
//!
//! One variant per tick. Action phases change a line; the `*Check` phase
//! after each one polls until the line actually reaches the level.

/// Bus engine sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Nothing queued, tick source stopped
    #[default]
    Idle,
    /// Both lines released; waiting for them to read high
    AwaitIdle,

    // START: DATA falls while CLOCK is high, then CLOCK falls
    SdaLowStart,
    SdaLowStartCheck,
    SclLowStart,
    SclLowStartCheck,

    // Repeated START: release DATA then CLOCK, then START again
    SdaHighRestart,
    SdaHighRestartCheck,
    SclHighRestart,
    SclHighRestartCheck,

    // One bit: CLOCK low, set DATA, CLOCK high, sample
    SclLowData,
    SclLowDataCheck,
    SclHighData,
    SclHighDataCheck,

    // STOP: both low, release CLOCK, then DATA rises while CLOCK is high
    SclSdaLowStop,
    SclSdaLowStopCheck,
    SclHighStop,
    SclHighStopCheck,
    SdaHighStop,
    SdaHighStopCheck,
}

/// Protocol step a phase belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhaseGroup {
    Idle,
    Start,
    Restart,
    Data,
    Stop,
}

impl Phase {
    /// Protocol step this phase is part of
    pub fn group(&self) -> PhaseGroup {
        use Phase::*;

        match self {
            Idle => PhaseGroup::Idle,
            AwaitIdle | SdaLowStart | SdaLowStartCheck | SclLowStart | SclLowStartCheck => {
                PhaseGroup::Start
            }
            SdaHighRestart | SdaHighRestartCheck | SclHighRestart | SclHighRestartCheck => {
                PhaseGroup::Restart
            }
            SclLowData | SclLowDataCheck | SclHighData | SclHighDataCheck => PhaseGroup::Data,
            SclSdaLowStop | SclSdaLowStopCheck | SclHighStop | SclHighStopCheck | SdaHighStop
            | SdaHighStopCheck => PhaseGroup::Stop,
        }
    }

    /// Check if this phase polls a line and counts toward the bus timeout
    pub fn is_check(&self) -> bool {
        use Phase::*;

        matches!(
            self,
            AwaitIdle
                | SdaLowStartCheck
                | SclLowStartCheck
                | SdaHighRestartCheck
                | SclHighRestartCheck
                | SclLowDataCheck
                | SclHighDataCheck
                | SclSdaLowStopCheck
                | SclHighStopCheck
                | SdaHighStopCheck
        )
    }

    /// Check if the engine is between START and the end of STOP
    pub fn is_active(&self) -> bool {
        !matches!(self, Phase::Idle)
    }
}
