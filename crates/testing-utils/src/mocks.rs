//! Mock implementations for the repository and robot control traits
//!
//! These are in-memory and can be used for unit testing without a database
//! or a reachable robot.

use async_trait::async_trait;
use chrono::Utc;
use fleet_core::errors::RobotControlError;
use fleet_core::models::{
    Event, EventStatus, MissionOutcome, NewEvent, NewReport, Report, ReportStatus, Robot,
    RobotStatus,
};
use fleet_core::traits::{
    EventRepository, ReportRepository, RobotControlClient, RobotRepository,
    StartMissionResponse, StopMissionResponse,
};
use fleet_core::{SchedulerError, SchedulerResult, TimeWindow};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
struct StoreState {
    robots: HashMap<i64, Robot>,
    events: HashMap<i64, Event>,
    reports: HashMap<i64, Report>,
    next_robot_id: i64,
    next_event_id: i64,
    next_report_id: i64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            robots: HashMap::new(),
            events: HashMap::new(),
            reports: HashMap::new(),
            next_robot_id: 1,
            next_event_id: 1,
            next_report_id: 1,
        }
    }
}

impl StoreState {
    fn overlapping(&self, robot_id: i64, window: &TimeWindow) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .values()
            .filter(|e| e.robot_id == robot_id && e.window().overlaps(window))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.start_time, e.id));
        events
    }
}

/// In-memory store implementing every repository trait
///
/// All three repositories share one lock, which makes the conditional writes
/// (`compare_and_set_status`, `start_with_report`, `complete_with_report`,
/// `delete_if_status`) atomic
/// in the same way the SQL implementation is.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }

    /// Insert a robot keeping its id (id 0 gets the next free id)
    pub fn insert_robot(&self, robot: Robot) -> Robot {
        let mut state = self.state();
        let mut robot = robot;
        if robot.id == 0 {
            robot.id = state.next_robot_id;
        }
        state.next_robot_id = state.next_robot_id.max(robot.id + 1);
        state.robots.insert(robot.id, robot.clone());
        robot
    }

    /// Insert an event as-is, bypassing the overlap check
    pub fn insert_event(&self, event: Event) -> Event {
        let mut state = self.state();
        let mut event = event;
        if event.id == 0 {
            event.id = state.next_event_id;
        }
        state.next_event_id = state.next_event_id.max(event.id + 1);
        state.events.insert(event.id, event.clone());
        event
    }

    pub fn set_robot_status(&self, robot_id: i64, status: RobotStatus) {
        if let Some(robot) = self.state().robots.get_mut(&robot_id) {
            robot.status = status;
        }
    }

    /// Overwrite an event's status and bump its version, simulating a concurrent writer
    pub fn force_event_status(&self, event_id: i64, status: EventStatus) {
        if let Some(event) = self.state().events.get_mut(&event_id) {
            event.status = status;
            event.version += 1;
        }
    }

    pub fn remove_event(&self, event_id: i64) {
        self.state().events.remove(&event_id);
    }

    pub fn event(&self, id: i64) -> Option<Event> {
        self.state().events.get(&id).cloned()
    }

    pub fn events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.state().events.values().cloned().collect();
        events.sort_by_key(|e| e.id);
        events
    }

    pub fn reports(&self) -> Vec<Report> {
        let mut reports: Vec<Report> = self.state().reports.values().cloned().collect();
        reports.sort_by_key(|r| r.id);
        reports
    }

    pub fn report_count(&self) -> usize {
        self.state().reports.len()
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn create(&self, event: &NewEvent) -> SchedulerResult<Event> {
        let mut state = self.state();

        let conflicts = state.overlapping(event.robot_id, &event.window());
        if !conflicts.is_empty() {
            return Err(SchedulerError::conflict(
                event.robot_id,
                conflicts.iter().map(|e| e.id).collect(),
            ));
        }

        let id = state.next_event_id;
        state.next_event_id += 1;

        let created = Event {
            id,
            robot_id: event.robot_id,
            mission_id: event.mission_id.clone(),
            start_time: event.start_time,
            estimated_duration: event.estimated_duration,
            end_time: event.end_time(),
            status: EventStatus::Pending,
            report_id: None,
            version: 0,
            created_at: Utc::now(),
        };
        state.events.insert(id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Event>> {
        Ok(self.state().events.get(&id).cloned())
    }

    async fn get_by_status(&self, status: EventStatus) -> SchedulerResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .state()
            .events
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.start_time, e.id));
        Ok(events)
    }

    async fn get_overlapping(
        &self,
        robot_id: i64,
        window: &TimeWindow,
    ) -> SchedulerResult<Vec<Event>> {
        Ok(self.state().overlapping(robot_id, window))
    }

    async fn compare_and_set_status(
        &self,
        id: i64,
        expected_version: i64,
        status: EventStatus,
    ) -> SchedulerResult<Option<Event>> {
        let mut state = self.state();
        match state.events.get_mut(&id) {
            Some(event) if event.version == expected_version => {
                event.status = status;
                event.version += 1;
                Ok(Some(event.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn start_with_report(
        &self,
        id: i64,
        expected_version: i64,
        report: &NewReport,
    ) -> SchedulerResult<Option<(Event, Report)>> {
        let mut state = self.state();

        let precondition = matches!(
            state.events.get(&id),
            Some(e) if e.version == expected_version && e.status == EventStatus::Pending
        );
        if !precondition {
            return Ok(None);
        }

        let report_id = state.next_report_id;
        state.next_report_id += 1;
        let created_report = Report {
            id: report_id,
            robot_id: report.robot_id,
            external_mission_id: report.external_mission_id.clone(),
            mission_id: report.mission_id.clone(),
            status: ReportStatus::InProgress,
            start_time: report.start_time,
        };
        state.reports.insert(report_id, created_report.clone());

        let event = state
            .events
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::event_not_found(id))?;
        event.status = EventStatus::Started;
        event.report_id = Some(report_id);
        event.version += 1;

        Ok(Some((event.clone(), created_report)))
    }

    async fn complete_with_report(
        &self,
        id: i64,
        expected_version: i64,
        outcome: MissionOutcome,
    ) -> SchedulerResult<Option<(Event, Option<Report>)>> {
        let mut state = self.state();

        let report_id = match state.events.get(&id) {
            Some(e) if e.version == expected_version && e.status == EventStatus::Started => {
                e.report_id
            }
            _ => return Ok(None),
        };

        // A missing report leaves both rows untouched
        let report = match report_id {
            Some(report_id) => {
                let report = state
                    .reports
                    .get_mut(&report_id)
                    .ok_or_else(|| SchedulerError::report_not_found(report_id))?;
                report.status = ReportStatus::from(outcome);
                Some(report.clone())
            }
            None => None,
        };

        let event = state
            .events
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::event_not_found(id))?;
        event.status = outcome.event_status();
        event.version += 1;

        Ok(Some((event.clone(), report)))
    }

    async fn delete_if_status(&self, id: i64, status: EventStatus) -> SchedulerResult<bool> {
        let mut state = self.state();
        if matches!(state.events.get(&id), Some(e) if e.status == status) {
            state.events.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl RobotRepository for InMemoryStore {
    async fn create(&self, robot: &Robot) -> SchedulerResult<Robot> {
        let mut robot = robot.clone();
        robot.id = 0;
        Ok(self.insert_robot(robot))
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Robot>> {
        Ok(self.state().robots.get(&id).cloned())
    }

    async fn update_status(&self, id: i64, status: RobotStatus) -> SchedulerResult<Robot> {
        let mut state = self.state();
        let robot = state
            .robots
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::robot_not_found(id))?;
        robot.status = status;
        Ok(robot.clone())
    }

    async fn set_enabled(&self, id: i64, enabled: bool) -> SchedulerResult<Robot> {
        let mut state = self.state();
        let robot = state
            .robots
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::robot_not_found(id))?;
        robot.enabled = enabled;
        Ok(robot.clone())
    }
}

#[async_trait]
impl ReportRepository for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Report>> {
        Ok(self.state().reports.get(&id).cloned())
    }

    async fn get_by_robot_id(&self, robot_id: i64) -> SchedulerResult<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .state()
            .reports
            .values()
            .filter(|r| r.robot_id == robot_id)
            .cloned()
            .collect();
        reports.sort_by_key(|r| r.id);
        Ok(reports)
    }

    async fn update_status(&self, id: i64, status: ReportStatus) -> SchedulerResult<Report> {
        let mut state = self.state();
        let report = state
            .reports
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::report_not_found(id))?;
        report.status = status;
        Ok(report.clone())
    }
}

/// A recorded `start_mission` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartCall {
    pub host: String,
    pub port: u16,
    pub mission_id: String,
}

/// Scriptable robot control client
///
/// By default every start succeeds with external id `isar-{mission_id}`.
#[derive(Debug, Clone, Default)]
pub struct MockRobotControlClient {
    start_result: Arc<Mutex<Option<Result<StartMissionResponse, RobotControlError>>>>,
    stop_result: Arc<Mutex<Option<Result<StopMissionResponse, RobotControlError>>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    start_calls: Arc<Mutex<Vec<StartCall>>>,
    stop_calls: Arc<Mutex<Vec<(String, u16)>>>,
}

impl MockRobotControlClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: RobotControlError) {
        *self.start_result.lock().unwrap() = Some(Err(error));
    }

    pub fn respond_with(&self, response: StartMissionResponse) {
        *self.start_result.lock().unwrap() = Some(Ok(response));
    }

    pub fn stop_with(&self, result: Result<StopMissionResponse, RobotControlError>) {
        *self.stop_result.lock().unwrap() = Some(result);
    }

    /// Back to the default successful start
    pub fn succeed(&self) {
        *self.start_result.lock().unwrap() = None;
    }

    /// Delay every call, used to exercise timeouts
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn start_calls(&self) -> Vec<StartCall> {
        self.start_calls.lock().unwrap().clone()
    }

    pub fn start_call_count(&self) -> usize {
        self.start_calls.lock().unwrap().len()
    }

    pub fn stop_calls(&self) -> Vec<(String, u16)> {
        self.stop_calls.lock().unwrap().clone()
    }

    async fn maybe_delay(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RobotControlClient for MockRobotControlClient {
    async fn start_mission(
        &self,
        host: &str,
        port: u16,
        mission_id: &str,
    ) -> Result<StartMissionResponse, RobotControlError> {
        self.start_calls.lock().unwrap().push(StartCall {
            host: host.to_string(),
            port,
            mission_id: mission_id.to_string(),
        });
        self.maybe_delay().await;

        let scripted = self.start_result.lock().unwrap().clone();
        scripted.unwrap_or_else(|| {
            Ok(StartMissionResponse {
                message: "Mission started".to_string(),
                started: true,
                mission_id: Some(format!("isar-{mission_id}")),
            })
        })
    }

    async fn stop_mission(
        &self,
        host: &str,
        port: u16,
    ) -> Result<StopMissionResponse, RobotControlError> {
        self.stop_calls.lock().unwrap().push((host.to_string(), port));
        self.maybe_delay().await;

        let scripted = self.stop_result.lock().unwrap().clone();
        scripted.unwrap_or_else(|| {
            Ok(StopMissionResponse {
                message: "Mission stopping".to_string(),
                stopped: true,
            })
        })
    }
}
