//! Milestone and sprint decisions.
//!
//! [`evaluate`] is pure: it mutates the tracking flags and returns the side
//! effects the caller has to carry out, in order.
//!
//! ```text
//! IDLE -> RUNNING <-> SPRINTING
//!            |
//!            +-- first fetch >= 1M --> REACHED_INTERMEDIATE -> RUNNING (10M ceiling)
//!            +-- later fetch >= ceiling --> REACHED_FINAL -> STOPPED
//! ```

use milestone_core::{
    MonitorPhase, TrackingState, FIRST_TARGET, SPRINT_INTERVAL_SECS, SPRINT_WINDOW,
};

/// Per-tick configuration handed to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Configured sampling interval for this item (seconds)
    pub interval: u64,
}

/// Side effect requested by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    /// Sleep this many seconds between ticks from now on
    SetInterval(u64),
    /// Persist the tracking flags now, before any following notification
    PersistState,
    /// Announce that `view` is close to `target`
    SprintAlert {
        /// Ceiling being approached
        target: u64,
        /// Current count
        view: u64,
    },
    /// Announce that `target` was reached
    Milestone {
        /// Ceiling reached
        target: u64,
        /// Current count
        view: u64,
    },
    /// Terminate the polling loop
    Stop,
}

/// Apply one observed count to `state`.
pub fn evaluate(state: &mut TrackingState, view: u64, config: &PolicyConfig) -> Vec<PolicyAction> {
    let mut actions = Vec::new();
    let mut escalated = false;

    if !state.first_fetch_done {
        state.first_fetch_done = true;
        if view >= FIRST_TARGET {
            state.extended_target_mode = true;
            escalated = true;
            actions.push(PolicyAction::Milestone { target: FIRST_TARGET, view });
        }
    } else {
        let target = state.target();
        if view >= target {
            state.phase = MonitorPhase::ReachedFinal;
            state.is_monitoring = false;
            actions.push(PolicyAction::Milestone { target, view });
            actions.push(PolicyAction::Stop);
            return actions;
        }
    }

    let target = state.target();
    let remaining = target.saturating_sub(view);
    let sprinting = remaining > 0 && remaining <= SPRINT_WINDOW;

    let wanted = if sprinting { SPRINT_INTERVAL_SECS } else { config.interval.max(1) };
    if state.effective_interval != wanted {
        state.effective_interval = wanted;
        actions.push(PolicyAction::SetInterval(wanted));
    }

    if sprinting && !state.sprint_alert_sent_for(target) {
        state.special_push_done = true;
        state.special_push_target = Some(target);
        actions.push(PolicyAction::PersistState);
        actions.push(PolicyAction::SprintAlert { target, view });
    }

    state.phase = if escalated {
        MonitorPhase::ReachedIntermediate
    } else if sprinting {
        MonitorPhase::Sprinting
    } else {
        MonitorPhase::Running
    };
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use milestone_core::{PersistedState, FINAL_TARGET};

    const CFG: PolicyConfig = PolicyConfig { interval: 75 };

    fn running() -> TrackingState {
        let mut s = TrackingState::new(75);
        s.first_fetch_done = true;
        s.is_monitoring = true;
        s
    }

    fn alerts(actions: &[PolicyAction]) -> usize {
        actions.iter().filter(|a| matches!(a, PolicyAction::SprintAlert { .. })).count()
    }

    fn milestones(actions: &[PolicyAction]) -> Vec<u64> {
        actions
            .iter()
            .filter_map(|a| match a {
                PolicyAction::Milestone { target, .. } => Some(*target),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_ordinary_tick_does_nothing() {
        let mut s = running();
        assert!(evaluate(&mut s, 500_000, &CFG).is_empty());
        assert_eq!(s.phase, MonitorPhase::Running);
    }

    #[test]
    fn test_sprint_fires_once() {
        let mut s = running();
        let first = evaluate(&mut s, 999_600, &CFG);
        assert_eq!(
            first,
            vec![
                PolicyAction::SetInterval(SPRINT_INTERVAL_SECS),
                PolicyAction::PersistState,
                PolicyAction::SprintAlert { target: FIRST_TARGET, view: 999_600 },
            ]
        );
        assert_eq!(s.phase, MonitorPhase::Sprinting);

        let second = evaluate(&mut s, 999_700, &CFG);
        assert!(second.is_empty());
        assert_eq!(s.effective_interval, SPRINT_INTERVAL_SECS);
    }

    #[test]
    fn test_sprint_does_not_refire_after_restart() {
        let mut s = running();
        assert_eq!(alerts(&evaluate(&mut s, 999_600, &CFG)), 1);
        let blob: PersistedState = s.persisted();

        let mut resumed = TrackingState::new(75);
        resumed.resume(Some(999_600), &blob);
        let actions = evaluate(&mut resumed, 999_700, &CFG);
        assert_eq!(alerts(&actions), 0);
        assert_eq!(actions, vec![PolicyAction::SetInterval(SPRINT_INTERVAL_SECS)]);
    }

    #[test]
    fn test_sprint_window_boundary() {
        let mut s = running();
        s.first_fetch_done = false;
        let actions = evaluate(&mut s, 999_000, &CFG);
        assert!(actions.is_empty());
        let actions = evaluate(&mut s, 999_500, &CFG);
        assert_eq!(alerts(&actions), 1);
    }

    #[test]
    fn test_first_fetch_above_first_target_escalates() {
        let mut s = TrackingState::new(75);
        let actions = evaluate(&mut s, 1_050_000, &CFG);
        assert_eq!(milestones(&actions), vec![FIRST_TARGET]);
        assert!(!actions.contains(&PolicyAction::Stop));
        assert!(s.extended_target_mode);
        assert_eq!(s.phase, MonitorPhase::ReachedIntermediate);

        let actions = evaluate(&mut s, 5_000_000, &CFG);
        assert!(actions.is_empty());
        assert_eq!(s.phase, MonitorPhase::Running);

        let actions = evaluate(&mut s, 10_200_000, &CFG);
        assert_eq!(milestones(&actions), vec![FINAL_TARGET]);
        assert_eq!(actions.last(), Some(&PolicyAction::Stop));
        assert_eq!(s.phase, MonitorPhase::ReachedFinal);
    }

    #[test]
    fn test_later_crossing_of_first_target_stops() {
        let mut s = running();
        let actions = evaluate(&mut s, 1_000_001, &CFG);
        assert_eq!(
            actions,
            vec![
                PolicyAction::Milestone { target: FIRST_TARGET, view: 1_000_001 },
                PolicyAction::Stop,
            ]
        );
        assert!(!s.extended_target_mode);
        assert!(!s.is_monitoring);
    }

    #[test]
    fn test_extended_mode_gets_its_own_sprint_alert() {
        let mut s = running();
        assert_eq!(alerts(&evaluate(&mut s, 999_800, &CFG)), 1);
        s.extended_target_mode = true;
        let actions = evaluate(&mut s, 9_999_900, &CFG);
        assert_eq!(alerts(&actions), 1);
        assert_eq!(s.special_push_target, Some(FINAL_TARGET));
    }

    #[test]
    fn test_leaving_sprint_window_restores_interval() {
        let mut s = running();
        evaluate(&mut s, 999_600, &CFG);
        s.extended_target_mode = true;
        let actions = evaluate(&mut s, 999_900, &CFG);
        assert_eq!(actions, vec![PolicyAction::SetInterval(75)]);
        assert_eq!(s.phase, MonitorPhase::Running);
    }

    #[test]
    fn test_configured_interval_change_is_picked_up() {
        let mut s = running();
        let actions = evaluate(&mut s, 10, &PolicyConfig { interval: 30 });
        assert_eq!(actions, vec![PolicyAction::SetInterval(30)]);
        assert_eq!(s.effective_interval, 30);
    }
}
