//! Decision rules
//!
//! Maps one presence outcome and the instance's target to a status and
//! action. Pure and deterministic: the same inputs always give the same
//! decision. Rules are applied in order and the first match wins:
//!
//! 1. Failed query or missing presence type: `Unknown`, relaunch with stop.
//! 2. Offline or online outside the app: `Offline`, relaunch with stop.
//! 3. Anything other than in-app: `NotInApp`, relaunch with stop.
//! 4. In-app at another (or unknown) location: `WrongLocation`, relaunch
//!    without stopping.
//! 5. In-app at the target: `OnTarget`, no action.

use rejoin_api::{Decision, Observation, PresenceType, StatusClass};
use rejoin_host_api::PresenceResult;
use rejoin_util::LocationId;

/// Evaluate a presence outcome against the target location
pub fn evaluate(outcome: &PresenceResult<Observation>, target: &LocationId) -> Decision {
    let observation = match outcome {
        Ok(observation) => observation,
        Err(e) => {
            return Decision::relaunch(StatusClass::Unknown, format!("presence unknown: {}", e), false);
        }
    };

    let Some(presence) = observation.presence_type else {
        return Decision::relaunch(StatusClass::Unknown, "presence type missing", false);
    };

    match presence {
        PresenceType::Offline | PresenceType::Away => {
            Decision::relaunch(StatusClass::Offline, presence.to_string(), false)
        }
        PresenceType::InStudio | PresenceType::Other(_) => {
            Decision::relaunch(StatusClass::NotInApp, presence.to_string(), false)
        }
        PresenceType::InApp => match &observation.location {
            Some(location) if location == target => {
                Decision::no_action(StatusClass::OnTarget, format!("in place {}", location))
            }
            Some(location) => Decision::relaunch(
                StatusClass::WrongLocation,
                format!("in place {}, expected {}", location, target),
                true,
            ),
            None => Decision::relaunch(
                StatusClass::WrongLocation,
                format!("in game at unknown place, expected {}", target),
                true,
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rejoin_host_api::PresenceError;

    fn target() -> LocationId {
        LocationId::new("2753915549")
    }

    fn observed(presence: PresenceType, location: Option<&str>) -> PresenceResult<Observation> {
        Ok(Observation::new(presence, location.map(LocationId::from)))
    }

    #[test]
    fn failure_is_unknown_with_stop() {
        let outcomes: Vec<PresenceResult<Observation>> = vec![
            Err(PresenceError::Timeout),
            Err(PresenceError::Transport("connection reset".into())),
            Err(PresenceError::Status(429)),
            Err(PresenceError::Malformed("eof".into())),
            Ok(Observation::empty()),
        ];

        for outcome in &outcomes {
            let decision = evaluate(outcome, &target());
            assert_eq!(decision.class, StatusClass::Unknown);
            assert!(decision.action_required);
            assert!(!decision.skip_kill);
        }
    }

    #[test]
    fn offline_and_away_relaunch_with_stop() {
        for presence in [PresenceType::Offline, PresenceType::Away] {
            let decision = evaluate(&observed(presence, None), &target());
            assert_eq!(decision.class, StatusClass::Offline);
            assert!(decision.action_required);
            assert!(!decision.skip_kill);
        }
    }

    #[test]
    fn studio_and_unknown_codes_are_not_in_app() {
        for presence in [PresenceType::InStudio, PresenceType::Other(9)] {
            let decision = evaluate(&observed(presence, Some("2753915549")), &target());
            assert_eq!(decision.class, StatusClass::NotInApp);
            assert!(decision.action_required);
            assert!(!decision.skip_kill);
        }
    }

    #[test]
    fn wrong_location_skips_kill() {
        let decision = evaluate(&observed(PresenceType::InApp, Some("1")), &target());
        assert_eq!(decision.class, StatusClass::WrongLocation);
        assert!(decision.action_required);
        assert!(decision.skip_kill);
    }

    #[test]
    fn missing_location_counts_as_wrong() {
        let decision = evaluate(&observed(PresenceType::InApp, None), &target());
        assert_eq!(decision.class, StatusClass::WrongLocation);
        assert!(decision.skip_kill);
    }

    #[test]
    fn on_target_needs_no_action() {
        let decision = evaluate(&observed(PresenceType::InApp, Some("2753915549")), &target());
        assert_eq!(decision.class, StatusClass::OnTarget);
        assert!(!decision.action_required);
        assert!(!decision.skip_kill);
    }

    #[test]
    fn action_required_iff_not_on_target() {
        let cases = [
            observed(PresenceType::Offline, None),
            observed(PresenceType::Away, None),
            observed(PresenceType::InApp, Some("1")),
            observed(PresenceType::InApp, Some("2753915549")),
            observed(PresenceType::InStudio, None),
            Ok(Observation::empty()),
            Err(PresenceError::Timeout),
        ];

        for outcome in &cases {
            let decision = evaluate(outcome, &target());
            assert_eq!(
                decision.action_required,
                decision.class != StatusClass::OnTarget
            );
            // skip_kill only ever accompanies a wrong location
            if decision.skip_kill {
                assert_eq!(decision.class, StatusClass::WrongLocation);
            }
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let outcome = observed(PresenceType::InApp, Some("1"));
        let first = evaluate(&outcome, &target());
        let second = evaluate(&outcome, &target());
        assert_eq!(first, second);
    }
}
