//! Live-session registry and interim-update scheduling
//!
//! Sessions with a positive interim interval live in the active partition and
//! are visited by [`AcctScheduler::do_accounting`]; sessions without one live
//! in the passive partition and only ever get a Start and a Stop record.
//! A key is in at most one partition at a time.

use crate::config::NasConfig;
use crate::error::AcctError;
use crate::record::{send_record, RecordKind};
use crate::session::AcctSession;
use crate::status::StatusSource;
use crate::transport::AccountingTransport;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which partition a registered session lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Active,
    Passive,
}

pub struct AcctScheduler {
    active: HashMap<String, AcctSession>,
    passive: HashMap<String, AcctSession>,
    nas: NasConfig,
    transport: Arc<dyn AccountingTransport>,
    status: Arc<dyn StatusSource>,
}

/// Pull fresh counters for `session`; zero when the status source has none
async fn refresh_counters(status: &dyn StatusSource, session: &mut AcctSession) {
    match status.lookup(&session.status_file_key).await {
        Some((bytes_in, bytes_out)) => session.set_counters(bytes_in, bytes_out),
        None => {
            warn!(
                key = %session.key,
                username = %session.username,
                common_name = %session.common_name,
                status_key = %session.status_file_key,
                "No status entry for session, reporting zero counters"
            );
            session.set_counters(0, 0);
        }
    }
}

impl AcctScheduler {
    pub fn new(
        nas: NasConfig,
        transport: Arc<dyn AccountingTransport>,
        status: Arc<dyn StatusSource>,
    ) -> Self {
        AcctScheduler {
            active: HashMap::new(),
            passive: HashMap::new(),
            nas,
            transport,
            status,
        }
    }

    pub fn nas(&self) -> &NasConfig {
        &self.nas
    }

    pub fn transport(&self) -> &dyn AccountingTransport {
        self.transport.as_ref()
    }

    /// Register a session in the partition its interval selects
    pub fn add_user(&mut self, session: AcctSession) -> Result<(), AcctError> {
        if self.partition_of(&session.key).is_some() {
            return Err(AcctError::DuplicateSession(session.key));
        }

        let partition = if session.is_active() {
            &mut self.active
        } else {
            &mut self.passive
        };
        debug!(
            key = %session.key,
            username = %session.username,
            interval = session.interim_interval,
            "Session registered"
        );
        partition.insert(session.key.clone(), session);
        Ok(())
    }

    /// Remove a session and send its Stop record
    ///
    /// The session is gone from the registry even when the Stop record fails.
    pub async fn del_user(&mut self, key: &str, now: u64) -> Result<(), AcctError> {
        let mut session = self
            .active
            .remove(key)
            .or_else(|| self.passive.remove(key))
            .ok_or_else(|| AcctError::NotFound(key.to_string()))?;

        refresh_counters(self.status.as_ref(), &mut session).await;
        let result = send_record(RecordKind::Stop, &session, &self.nas, self.transport.as_ref(), now).await;

        info!(
            key = %session.key,
            username = %session.username,
            common_name = %session.common_name,
            bytes_in = session.total_in(),
            bytes_out = session.total_out(),
            session_time = session.session_time(now),
            stopped = result.is_ok(),
            "Session removed"
        );
        result
    }

    /// Look a session up, active partition first
    pub fn find_user(&self, key: &str) -> Option<&AcctSession> {
        self.active.get(key).or_else(|| self.passive.get(key))
    }

    pub fn partition_of(&self, key: &str) -> Option<Partition> {
        if self.active.contains_key(key) {
            Some(Partition::Active)
        } else if self.passive.contains_key(key) {
            Some(Partition::Passive)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.passive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.passive.is_empty()
    }

    /// Send Interim-Update records for every active session that is due
    ///
    /// Returns how many sessions were due.
    pub async fn do_accounting(&mut self, now: u64) -> usize {
        let mut due = 0;
        for session in self.active.values_mut() {
            if now < session.next_update {
                continue;
            }
            due += 1;

            refresh_counters(self.status.as_ref(), session).await;
            if let Err(e) =
                send_record(RecordKind::Interim, session, &self.nas, self.transport.as_ref(), now).await
            {
                warn!(
                    key = %session.key,
                    username = %session.username,
                    common_name = %session.common_name,
                    error = %e,
                    "Interim update failed"
                );
            }
            session.advance_update();
        }
        due
    }

    /// Stop every registered session, carrying on past failures
    pub async fn del_all_users(&mut self, now: u64) {
        let keys: Vec<String> = self.active.keys().chain(self.passive.keys()).cloned().collect();
        if !keys.is_empty() {
            info!(sessions = keys.len(), "Stopping all sessions");
        }

        for key in keys {
            if let Err(e) = self.del_user(&key, now).await {
                warn!(key = %key, error = %e, "Stop record failed during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use radius_proto::{AttributeType, Code, Packet};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<Packet>>,
        fail: bool,
    }

    impl Recorder {
        fn status_types(&self) -> Vec<u32> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|p| {
                    p.find_attribute(AttributeType::AcctStatusType as u8)
                        .unwrap()
                        .as_integer()
                        .unwrap()
                })
                .collect()
        }

        fn usernames(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|p| p.find_attribute(AttributeType::UserName as u8).unwrap().to_display_string())
                .collect()
        }
    }

    #[async_trait]
    impl AccountingTransport for Recorder {
        async fn exchange(&self, request: &Packet) -> Result<Packet, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(TransportError::Timeout { attempts: 1, servers: 1 });
            }
            Ok(Packet::new(Code::AccountingResponse, request.identifier, [0u8; 16]))
        }
    }

    struct FixedStatus(Option<(u64, u64)>);

    #[async_trait]
    impl StatusSource for FixedStatus {
        async fn lookup(&self, _key: &str) -> Option<(u64, u64)> {
            self.0
        }
    }

    fn scheduler(transport: Arc<Recorder>, counters: Option<(u64, u64)>) -> AcctScheduler {
        AcctScheduler::new(NasConfig::default(), transport, Arc::new(FixedStatus(counters)))
    }

    fn session(key: &str, interval: u64, now: u64) -> AcctSession {
        let mut session = AcctSession {
            username: key.to_string(),
            session_id: format!("{}-sid", key),
            key: key.to_string(),
            status_file_key: format!("{},198.51.100.7:1", key),
            interim_interval: interval,
            ..Default::default()
        };
        session.start_at(now);
        session
    }

    #[test]
    fn test_add_user_partitions() {
        let mut sched = scheduler(Arc::new(Recorder::default()), None);
        sched.add_user(session("a", 60, 0)).unwrap();
        sched.add_user(session("p", 0, 0)).unwrap();

        assert_eq!(sched.partition_of("a"), Some(Partition::Active));
        assert_eq!(sched.partition_of("p"), Some(Partition::Passive));
        assert_eq!(sched.len(), 2);
    }

    #[test]
    fn test_add_user_duplicate_across_partitions() {
        let mut sched = scheduler(Arc::new(Recorder::default()), None);
        sched.add_user(session("k", 60, 0)).unwrap();

        let result = sched.add_user(session("k", 0, 0));
        assert!(matches!(result, Err(AcctError::DuplicateSession(_))));
        assert_eq!(sched.partition_of("k"), Some(Partition::Active));
        assert_eq!(sched.find_user("k").unwrap().interim_interval, 60);
        assert_eq!(sched.len(), 1);
    }

    #[tokio::test]
    async fn test_partition_invariant_over_sequence() {
        let mut sched = scheduler(Arc::new(Recorder::default()), None);
        let ops: [(&str, Option<u64>); 8] = [
            ("a", Some(30)),
            ("b", Some(0)),
            ("a", None),
            ("a", Some(0)),
            ("c", Some(10)),
            ("b", None),
            ("b", Some(5)),
            ("c", None),
        ];

        for (key, op) in ops {
            match op {
                Some(interval) => sched.add_user(session(key, interval, 0)).unwrap(),
                None => sched.del_user(key, 10).await.unwrap(),
            }
            for key in ["a", "b", "c"] {
                let in_active = sched.active.contains_key(key);
                let in_passive = sched.passive.contains_key(key);
                assert!(!(in_active && in_passive), "{} in both partitions", key);
            }
        }

        assert_eq!(sched.partition_of("a"), Some(Partition::Passive));
        assert_eq!(sched.partition_of("b"), Some(Partition::Active));
        assert_eq!(sched.partition_of("c"), None);
    }

    #[tokio::test]
    async fn test_del_user_not_found() {
        let mut sched = scheduler(Arc::new(Recorder::default()), None);
        let result = sched.del_user("missing", 0).await;
        assert!(matches!(result, Err(AcctError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_del_user_removes_even_when_stop_fails() {
        let transport = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let mut sched = scheduler(transport.clone(), Some((10, 20)));
        sched.add_user(session("k", 60, 0)).unwrap();

        let result = sched.del_user("k", 30).await;
        assert!(matches!(result, Err(AcctError::NoResponse)));
        assert!(sched.find_user("k").is_none());
        assert_eq!(transport.status_types(), vec![2]);
    }

    #[tokio::test]
    async fn test_do_accounting_skips_passive_and_not_due() {
        let transport = Arc::new(Recorder::default());
        let mut sched = scheduler(transport.clone(), Some((1, 2)));
        sched.add_user(session("active", 60, 1_000)).unwrap();
        sched.add_user(session("later", 120, 1_000)).unwrap();
        sched.add_user(session("passive", 0, 1_000)).unwrap();

        assert_eq!(sched.do_accounting(1_059).await, 0);
        assert_eq!(sched.do_accounting(1_060).await, 1);
        assert_eq!(transport.usernames(), vec!["active".to_string()]);
        assert_eq!(transport.status_types(), vec![3]);
    }

    #[tokio::test]
    async fn test_interim_schedule_does_not_drift() {
        let transport = Arc::new(Recorder::default());
        let mut sched = scheduler(transport.clone(), Some((1, 2)));
        let t0 = 10_000;
        sched.add_user(session("k", 60, t0)).unwrap();

        for n in 1..=10u64 {
            // ticks land a little late every time
            let tick = t0 + n * 60 + (n % 3);
            assert_eq!(sched.do_accounting(tick).await, 1);
            assert_eq!(sched.find_user("k").unwrap().next_update, t0 + (n + 1) * 60);
        }
        assert_eq!(transport.status_types().len(), 10);
    }

    #[tokio::test]
    async fn test_missed_ticks_catch_up() {
        let transport = Arc::new(Recorder::default());
        let mut sched = scheduler(transport.clone(), None);
        sched.add_user(session("k", 60, 0)).unwrap();

        assert_eq!(sched.do_accounting(200).await, 1);
        assert_eq!(sched.find_user("k").unwrap().next_update, 120);
        assert_eq!(sched.do_accounting(201).await, 1);
        assert_eq!(sched.do_accounting(202).await, 1);
        assert_eq!(sched.do_accounting(203).await, 0);
    }

    #[tokio::test]
    async fn test_interim_failure_still_advances() {
        let transport = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let mut sched = scheduler(transport, None);
        sched.add_user(session("k", 30, 0)).unwrap();

        assert_eq!(sched.do_accounting(30).await, 1);
        assert_eq!(sched.find_user("k").unwrap().next_update, 60);
    }

    #[tokio::test]
    async fn test_counters_refreshed_from_status() {
        let transport = Arc::new(Recorder::default());
        let mut sched = scheduler(transport.clone(), Some((5_000_000_000, 7)));
        sched.add_user(session("k", 60, 0)).unwrap();
        sched.do_accounting(60).await;

        let sent = transport.sent.lock().unwrap();
        let value = |t: AttributeType| sent[0].find_attribute(t as u8).unwrap().as_integer().unwrap();
        assert_eq!(value(AttributeType::AcctInputGigawords), 1);
        assert_eq!(value(AttributeType::AcctInputOctets), 705_032_704);
        assert_eq!(value(AttributeType::AcctOutputOctets), 7);
    }

    #[tokio::test]
    async fn test_del_all_users_drains_both_partitions() {
        let transport = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let mut sched = scheduler(transport.clone(), None);
        sched.add_user(session("a", 60, 0)).unwrap();
        sched.add_user(session("b", 60, 0)).unwrap();
        sched.add_user(session("p", 0, 0)).unwrap();

        sched.del_all_users(100).await;
        assert!(sched.is_empty());
        assert_eq!(transport.status_types(), vec![2, 2, 2]);
    }
}
