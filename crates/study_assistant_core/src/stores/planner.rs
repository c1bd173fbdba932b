//! crates/study_assistant_core/src/stores/planner.rs
//!
//! Study plans and their scheduled sessions.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{Persistor, PLANNER_RECORD};
use crate::domain::{now, NewStudySession, Progress, StudyPlan, StudySession};
use crate::ports::{PortError, PortResult, SnapshotStorage};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Persisted state of the planner store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerState {
    pub plans: Vec<StudyPlan>,
    pub active_plan_id: Option<Uuid>,
}

pub struct PlannerStore {
    state: PlannerState,
    persistor: Persistor,
}

impl PlannerStore {
    /// Opens the store, loading the last saved snapshot if there is one.
    pub fn open(storage: Arc<dyn SnapshotStorage>) -> PortResult<Self> {
        let persistor = Persistor::new(storage, PLANNER_RECORD);
        let state = persistor.load()?;
        Ok(Self { state, persistor })
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn plans(&self) -> &[StudyPlan] {
        &self.state.plans
    }

    pub fn get_active_plan(&self) -> Option<&StudyPlan> {
        let active = self.state.active_plan_id?;
        self.state.plans.iter().find(|p| p.id == active)
    }

    /// Stores a new plan, gives every session a fresh id and makes the plan active.
    pub fn create_plan(
        &mut self,
        name: impl Into<String>,
        sessions: Vec<NewStudySession>,
    ) -> PortResult<Uuid> {
        let sessions = sessions
            .into_iter()
            .map(|s| StudySession {
                id: Uuid::new_v4(),
                subject: s.subject,
                topic: s.topic,
                scheduled_at: s.scheduled_at,
                duration: s.duration,
                tasks: s.tasks,
                completed: false,
                completed_at: None,
            })
            .collect();
        let plan = StudyPlan {
            id: Uuid::new_v4(),
            name: name.into(),
            sessions,
            created_at: now(),
        };

        let id = self.persistor.commit(&mut self.state, |state| {
            let id = plan.id;
            state.plans.insert(0, plan);
            state.active_plan_id = Some(id);
            Ok(id)
        })?;
        debug!(plan_id = %id, "Study plan created");
        Ok(id)
    }

    pub fn delete_plan(&mut self, id: Uuid) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            let before = state.plans.len();
            state.plans.retain(|p| p.id != id);
            if state.plans.len() == before {
                return Err(PortError::NotFound(format!("Study plan {}", id)));
            }
            if state.active_plan_id == Some(id) {
                state.active_plan_id = None;
            }
            Ok(())
        })
    }

    pub fn set_active_plan(&mut self, id: Option<Uuid>) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            state.active_plan_id = id;
            Ok(())
        })
    }

    /// Marks a session as done. The session may belong to any plan, not only the active one.
    pub fn complete_session(&mut self, session_id: Uuid) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            let session = session_mut(state, session_id)?;
            session.completed = true;
            session.completed_at = Some(now());
            Ok(())
        })
    }

    /// Moves a session to `new_time`. No bounds are enforced.
    pub fn reschedule_session(
        &mut self,
        session_id: Uuid,
        new_time: DateTime<Utc>,
    ) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            session_mut(state, session_id)?.scheduled_at = new_time;
            Ok(())
        })
    }

    /// Completion counts over the active plan, zero when there is none.
    pub fn get_progress(&self) -> Progress {
        match self.get_active_plan() {
            Some(plan) => Progress {
                completed: plan.sessions.iter().filter(|s| s.completed).count(),
                total: plan.sessions.len(),
            },
            None => Progress::default(),
        }
    }

    /// Active plan sessions scheduled between local midnight today and local midnight tomorrow.
    pub fn get_today_sessions(&self) -> Vec<&StudySession> {
        self.sessions_on(Local::now().date_naive())
    }

    /// Active plan sessions scheduled on the given local calendar day.
    pub fn sessions_on(&self, day: NaiveDate) -> Vec<&StudySession> {
        let Some(plan) = self.get_active_plan() else {
            return Vec::new();
        };
        let start = local_midnight(day);
        let end = local_midnight(day.succ_opt().unwrap_or(day));
        plan.sessions
            .iter()
            .filter(|s| s.scheduled_at >= start && s.scheduled_at < end)
            .collect()
    }
}

fn session_mut(state: &mut PlannerState, session_id: Uuid) -> PortResult<&mut StudySession> {
    state
        .plans
        .iter_mut()
        .flat_map(|p| p.sessions.iter_mut())
        .find(|s| s.id == session_id)
        .ok_or_else(|| PortError::NotFound(format!("Study session {}", session_id)))
}

/// Start of `day` in the local timezone.
fn local_midnight(day: NaiveDate) -> DateTime<Utc> {
    start_of_day(day, |t| {
        Local
            .from_local_datetime(t)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    })
}

/// First minute of `day` that `resolve` can place on the timeline. When a DST
/// change skips midnight this is the end of the gap.
fn start_of_day(
    day: NaiveDate,
    resolve: impl Fn(&NaiveDateTime) -> Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    let midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    (0..MINUTES_PER_DAY)
        .map(|minute| midnight + Duration::minutes(minute))
        .find_map(|t| resolve(&t))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{FailingStorage, MemoryStorage};

    fn open_store() -> (Arc<MemoryStorage>, PlannerStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = PlannerStore::open(storage.clone()).unwrap();
        (storage, store)
    }

    fn session_at(scheduled_at: DateTime<Utc>) -> NewStudySession {
        NewStudySession {
            subject: "Math".into(),
            topic: "Integrals".into(),
            scheduled_at,
            duration: 45,
            tasks: vec!["Practice set".into()],
        }
    }

    #[test]
    fn progress_counts_completed_sessions_of_active_plan() {
        let (_, mut store) = open_store();
        let start = now();
        let sessions = (0..5).map(|i| session_at(start + Duration::days(i))).collect();
        store.create_plan("Finals", sessions).unwrap();

        let ids: Vec<Uuid> = store
            .get_active_plan()
            .unwrap()
            .sessions
            .iter()
            .map(|s| s.id)
            .collect();
        store.complete_session(ids[0]).unwrap();
        store.complete_session(ids[3]).unwrap();

        assert_eq!(store.get_progress(), Progress { completed: 2, total: 5 });
    }

    #[test]
    fn progress_without_active_plan_is_zero() {
        let (_, mut store) = open_store();
        assert_eq!(store.get_progress(), Progress { completed: 0, total: 0 });

        store.create_plan("Plan", vec![session_at(now())]).unwrap();
        store.set_active_plan(None).unwrap();
        assert_eq!(store.get_progress(), Progress::default());
    }

    #[test]
    fn new_plan_replaces_active_pointer() {
        let (_, mut store) = open_store();
        let first = store.create_plan("First", vec![]).unwrap();
        let second = store.create_plan("Second", vec![]).unwrap();
        assert_eq!(store.get_active_plan().unwrap().id, second);
        assert_eq!(store.plans()[1].id, first);
    }

    #[test]
    fn sessions_start_incomplete_with_fresh_ids() {
        let (_, mut store) = open_store();
        store
            .create_plan("Plan", vec![session_at(now()), session_at(now())])
            .unwrap();
        let sessions = &store.get_active_plan().unwrap().sessions;
        assert!(sessions.iter().all(|s| !s.completed && s.completed_at.is_none()));
        assert_ne!(sessions[0].id, sessions[1].id);
    }

    #[test]
    fn sessions_can_be_completed_in_inactive_plans() {
        let (_, mut store) = open_store();
        store.create_plan("Old", vec![session_at(now())]).unwrap();
        let old_session = store.get_active_plan().unwrap().sessions[0].id;
        store.create_plan("New", vec![session_at(now())]).unwrap();

        store.complete_session(old_session).unwrap();
        let old_plan = &store.plans()[1];
        assert!(old_plan.sessions[0].completed);
        assert!(old_plan.sessions[0].completed_at.is_some());
        assert_eq!(store.get_progress().completed, 0);
    }

    #[test]
    fn unknown_session_is_not_found() {
        let (_, mut store) = open_store();
        assert!(store.complete_session(Uuid::new_v4()).unwrap_err().is_not_found());
        assert!(store
            .reschedule_session(Uuid::new_v4(), now())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn reschedule_overwrites_time_without_validation() {
        let (_, mut store) = open_store();
        store.create_plan("Plan", vec![session_at(now())]).unwrap();
        let id = store.get_active_plan().unwrap().sessions[0].id;
        let past = now() - Duration::days(30);

        store.reschedule_session(id, past).unwrap();
        assert_eq!(store.get_active_plan().unwrap().sessions[0].scheduled_at, past);
    }

    #[test]
    fn today_sessions_use_local_day_boundaries() {
        let (_, mut store) = open_store();
        let today = Local::now().date_naive();
        let midnight = local_midnight(today);
        let tomorrow = local_midnight(today.succ_opt().unwrap());

        store
            .create_plan(
                "Plan",
                vec![
                    session_at(midnight),
                    session_at(midnight + Duration::hours(3)),
                    session_at(midnight - Duration::milliseconds(1)),
                    session_at(tomorrow),
                ],
            )
            .unwrap();

        let today_sessions = store.get_today_sessions();
        assert_eq!(today_sessions.len(), 2);
        assert!(today_sessions
            .iter()
            .all(|s| s.scheduled_at >= midnight && s.scheduled_at < tomorrow));
    }

    #[test]
    fn day_start_skips_a_dst_gap_at_midnight() {
        let day = NaiveDate::from_ymd_opt(2024, 9, 8).unwrap();
        let gap_end = day.and_hms_opt(1, 0, 0).unwrap();
        // Local clocks jump from 00:00 straight to 01:00, two hours behind UTC.
        let start = start_of_day(day, |t| {
            (*t >= gap_end).then(|| Utc.from_utc_datetime(t) + Duration::hours(2))
        });
        assert_eq!(start, Utc.from_utc_datetime(&gap_end) + Duration::hours(2));
    }

    #[test]
    fn day_start_is_midnight_without_a_gap() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let start = start_of_day(day, |t| Some(Utc.from_utc_datetime(t)));
        assert_eq!(start, Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap()));
    }

    #[test]
    fn failed_save_leaves_plans_unchanged() {
        let mut store = PlannerStore::open(Arc::new(FailingStorage)).unwrap();
        let err = store.create_plan("Plan", vec![session_at(now())]).unwrap_err();
        assert!(matches!(err, PortError::Storage(_)));
        assert!(store.plans().is_empty());
        assert!(store.get_active_plan().is_none());
    }

    #[test]
    fn deleting_active_plan_clears_pointer() {
        let (_, mut store) = open_store();
        let id = store.create_plan("Plan", vec![]).unwrap();
        store.delete_plan(id).unwrap();
        assert!(store.get_active_plan().is_none());
        assert!(store.get_today_sessions().is_empty());
        assert!(store.delete_plan(id).unwrap_err().is_not_found());
    }

    #[test]
    fn reopening_restores_identical_state() {
        let (storage, mut store) = open_store();
        store
            .create_plan("Plan", vec![session_at(now()), session_at(now() + Duration::days(1))])
            .unwrap();
        let id = store.get_active_plan().unwrap().sessions[1].id;
        store.complete_session(id).unwrap();

        let reopened = PlannerStore::open(storage).unwrap();
        assert_eq!(reopened.state(), store.state());
    }
}
