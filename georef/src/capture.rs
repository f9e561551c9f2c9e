//! The GCP capture protocol.
//!
//! Capture alternates strictly between the two rasters: advance, click on
//! the target, advance, click on the basemap. The machine is headless; the
//! GUI feeds it events and reacts to the returned [`Outcome`]. Events that
//! arrive outside their expected phase are absorbed silently so a
//! double-pressed advance key or a stray click never loses a staged point.

use crate::gcp::PixelCoord;

/// Which raster an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterKind {
    Target,
    Base,
}

/// Protocol phase. A point click is only accepted in the two `*Point`
/// phases, and only for the matching raster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    AwaitingAdvanceToTarget,
    AwaitingTargetPoint,
    AwaitingAdvanceToBase,
    AwaitingBasePoint,
}

/// Operator input, already resolved to source-pixel coordinates by the
/// viewport. The machine records whatever coordinate it is handed; bounds
/// checking is the viewport's job.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CaptureEvent {
    Advance,
    Click { raster: RasterKind, pos: PixelCoord },
}

/// Both halves of a finished correspondence, emitted exactly once per full
/// protocol cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompletedPair {
    pub target: PixelCoord,
    pub base: PixelCoord,
}

/// What an event did, for the GUI adapter to react to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    /// Out-of-protocol event, absorbed without touching any state.
    Ignored,
    /// An advance armed the given raster's pane.
    Armed(RasterKind),
    /// The target point was captured and staged.
    Staged(PixelCoord),
    /// The base point completed the staged pair.
    Completed(CompletedPair),
}

#[derive(Debug, Default)]
pub struct CaptureMachine {
    phase: Phase,
    staged: Option<PixelCoord>,
}

impl CaptureMachine {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The raster whose pane is currently armed for a click, if any.
    pub fn armed_raster(&self) -> Option<RasterKind> {
        match self.phase {
            Phase::AwaitingTargetPoint => Some(RasterKind::Target),
            Phase::AwaitingBasePoint => Some(RasterKind::Base),
            Phase::AwaitingAdvanceToTarget | Phase::AwaitingAdvanceToBase => None,
        }
    }

    /// Single entry point for all operator input.
    pub fn handle(&mut self, event: CaptureEvent) -> Outcome {
        match (self.phase, event) {
            (Phase::AwaitingAdvanceToTarget, CaptureEvent::Advance) => {
                self.phase = Phase::AwaitingTargetPoint;
                Outcome::Armed(RasterKind::Target)
            }
            (
                Phase::AwaitingTargetPoint,
                CaptureEvent::Click {
                    raster: RasterKind::Target,
                    pos,
                },
            ) => {
                self.staged = Some(pos);
                self.phase = Phase::AwaitingAdvanceToBase;
                Outcome::Staged(pos)
            }
            (Phase::AwaitingAdvanceToBase, CaptureEvent::Advance) => {
                self.phase = Phase::AwaitingBasePoint;
                Outcome::Armed(RasterKind::Base)
            }
            (
                Phase::AwaitingBasePoint,
                CaptureEvent::Click {
                    raster: RasterKind::Base,
                    pos,
                },
            ) => {
                let target = self
                    .staged
                    .take()
                    .expect("a target point is staged whenever a base point is awaited");
                self.phase = Phase::AwaitingAdvanceToTarget;
                Outcome::Completed(CompletedPair { target, base: pos })
            }
            _ => Outcome::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(raster: RasterKind, row: f64, col: f64) -> CaptureEvent {
        CaptureEvent::Click {
            raster,
            pos: PixelCoord { row, col },
        }
    }

    fn run(machine: &mut CaptureMachine, events: &[CaptureEvent]) -> Vec<CompletedPair> {
        events
            .iter()
            .filter_map(|&event| match machine.handle(event) {
                Outcome::Completed(pair) => Some(pair),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn one_full_cycle_emits_one_pair() {
        let mut machine = CaptureMachine::default();
        let pairs = run(
            &mut machine,
            &[
                CaptureEvent::Advance,
                click(RasterKind::Target, 10.0, 20.0),
                CaptureEvent::Advance,
                click(RasterKind::Base, 100.0, 200.0),
            ],
        );

        assert_eq!(
            pairs,
            vec![CompletedPair {
                target: PixelCoord {
                    row: 10.0,
                    col: 20.0
                },
                base: PixelCoord {
                    row: 100.0,
                    col: 200.0
                },
            }]
        );
        assert_eq!(machine.phase(), Phase::AwaitingAdvanceToTarget);
    }

    #[test]
    fn double_advance_is_a_no_op() {
        let mut machine = CaptureMachine::default();
        let pairs = run(
            &mut machine,
            &[
                CaptureEvent::Advance,
                CaptureEvent::Advance,
                click(RasterKind::Target, 5.0, 5.0),
                CaptureEvent::Advance,
                click(RasterKind::Base, 6.0, 6.0),
            ],
        );

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].target, PixelCoord { row: 5.0, col: 5.0 });
        assert_eq!(pairs[0].base, PixelCoord { row: 6.0, col: 6.0 });
    }

    #[test]
    fn repeated_target_click_does_not_restage() {
        let mut machine = CaptureMachine::default();
        let pairs = run(
            &mut machine,
            &[
                CaptureEvent::Advance,
                click(RasterKind::Target, 1.0, 1.0),
                click(RasterKind::Target, 2.0, 2.0),
                CaptureEvent::Advance,
                click(RasterKind::Base, 3.0, 3.0),
            ],
        );

        // The second target click arrived while awaiting an advance and must
        // not replace the staged point.
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].target, PixelCoord { row: 1.0, col: 1.0 });
        assert_eq!(pairs[0].base, PixelCoord { row: 3.0, col: 3.0 });
    }

    #[test]
    fn click_on_the_wrong_raster_is_ignored() {
        let mut machine = CaptureMachine::default();

        assert_eq!(machine.handle(CaptureEvent::Advance), Outcome::Armed(RasterKind::Target));
        assert_eq!(
            machine.handle(click(RasterKind::Base, 9.0, 9.0)),
            Outcome::Ignored
        );
        assert_eq!(machine.phase(), Phase::AwaitingTargetPoint);

        machine.handle(click(RasterKind::Target, 1.0, 2.0));
        machine.handle(CaptureEvent::Advance);
        assert_eq!(
            machine.handle(click(RasterKind::Target, 9.0, 9.0)),
            Outcome::Ignored
        );

        let outcome = machine.handle(click(RasterKind::Base, 3.0, 4.0));
        assert_eq!(
            outcome,
            Outcome::Completed(CompletedPair {
                target: PixelCoord { row: 1.0, col: 2.0 },
                base: PixelCoord { row: 3.0, col: 4.0 },
            })
        );
    }

    #[test]
    fn clicks_before_the_first_advance_are_ignored() {
        let mut machine = CaptureMachine::default();
        assert_eq!(
            machine.handle(click(RasterKind::Target, 1.0, 1.0)),
            Outcome::Ignored
        );
        assert_eq!(machine.phase(), Phase::AwaitingAdvanceToTarget);
        assert_eq!(machine.armed_raster(), None);
    }

    #[test]
    fn noisy_sequences_complete_exactly_the_full_cycles() {
        let noise = [
            CaptureEvent::Advance,
            click(RasterKind::Base, 0.0, 0.0),
            click(RasterKind::Target, 0.5, 0.5),
        ];

        let mut machine = CaptureMachine::default();
        let mut events = Vec::new();
        let cycles = 7;
        for i in 0..cycles {
            events.extend_from_slice(&noise);
            // The noise block above armed the target pane and staged (0.5, 0.5);
            // finish that cycle, then run a clean one.
            events.push(CaptureEvent::Advance);
            events.push(click(RasterKind::Base, i as f64, i as f64));

            events.push(CaptureEvent::Advance);
            events.push(click(RasterKind::Target, 10.0 + i as f64, 0.0));
            events.push(CaptureEvent::Advance);
            events.push(click(RasterKind::Base, 20.0 + i as f64, 0.0));
        }

        let pairs = run(&mut machine, &events);
        assert_eq!(pairs.len(), cycles * 2);
    }

    #[test]
    fn armed_raster_tracks_the_phase() {
        let mut machine = CaptureMachine::default();
        assert_eq!(machine.armed_raster(), None);

        machine.handle(CaptureEvent::Advance);
        assert_eq!(machine.armed_raster(), Some(RasterKind::Target));

        machine.handle(click(RasterKind::Target, 0.0, 0.0));
        assert_eq!(machine.armed_raster(), None);

        machine.handle(CaptureEvent::Advance);
        assert_eq!(machine.armed_raster(), Some(RasterKind::Base));
    }
}
