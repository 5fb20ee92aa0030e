use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{Backend, Config};
use crate::db::{LocalCache, MemoryStore, SqliteStore, Store};
use crate::gateway::{DisabledGateway, HttpGateway, RemoteGateway};
use crate::models::{Application, Interview, JoiningForm, Job};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Queue mutations that failed to reach the remote and replay them on the
    /// next contact. Off means a record saved offline never reaches the remote.
    pub replay_outbox: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self { replay_outbox: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Mutation {
    Upsert { record: Application },
    Delete,
}

/// A mutation the remote has not acknowledged yet. At most one per record id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    pub id: String,
    pub mutation: Mutation,
    pub queued_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub id: String,
    pub mirrored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub removed: bool,
    pub mirrored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    pub replayed: usize,
    /// Entries the remote answered but would not accept. They stay queued.
    pub refused: usize,
    pub remaining: usize,
    pub reachable: bool,
}

// --- Search sequencing ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchTicket(u64);

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub ticket: SearchTicket,
    pub query: String,
    pub records: Vec<Application>,
}

/// Hands out increasing tickets; only the response to the latest ticket is
/// accepted.
#[derive(Debug, Default)]
pub struct SearchSequencer {
    latest: AtomicU64,
}

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self) -> SearchTicket {
        SearchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn accept(&self, response: &SearchResponse) -> bool {
        response.ticket.0 >= self.latest.load(Ordering::SeqCst)
    }
}

// --- Coordinator ---

/// Local cache first, remote store second. Nothing here fails because the
/// remote is down; only local writes can return an error.
pub struct SyncCoordinator {
    cache: LocalCache,
    gateway: Box<dyn RemoteGateway>,
    policy: SyncPolicy,
}

impl SyncCoordinator {
    pub fn new(cache: LocalCache, gateway: Box<dyn RemoteGateway>, policy: SyncPolicy) -> Self {
        Self {
            cache,
            gateway,
            policy,
        }
    }

    pub fn from_config(config: &Config, offline: bool) -> Result<Self> {
        let store: Box<dyn Store> = match config.storage.backend {
            Backend::Sqlite => {
                let store = SqliteStore::open(&config.database_path())?;
                tracing::debug!(path = %store.path().display(), "opened sqlite cache");
                Box::new(store)
            }
            Backend::Memory => Box::new(MemoryStore::new()),
        };
        let cache = LocalCache::new(store, &config.storage.namespace);

        let gateway: Box<dyn RemoteGateway> = match &config.remote.base_url {
            Some(url) if !offline => {
                let gateway = HttpGateway::new(url, config.remote.timeout())?;
                tracing::debug!(base_url = gateway.base_url(), timeout_ms = config.remote.timeout_ms, "remote store enabled");
                Box::new(gateway)
            }
            _ => {
                tracing::debug!(offline, "running local-only");
                Box::new(DisabledGateway)
            }
        };

        let policy = SyncPolicy {
            replay_outbox: config.sync.replay_outbox,
        };
        Ok(Self::new(cache, gateway, policy))
    }

    pub fn save(&mut self, form: JoiningForm) -> Result<SaveOutcome> {
        let mut apps = self.cache.applications();
        let now = Utc::now();
        let id = next_id("APP", now.timestamp_millis(), |candidate| {
            apps.iter().any(|a| a.id == candidate)
        });

        let mut form = form;
        if form.submission_date.trim().is_empty() {
            form.submission_date = now.format("%Y-%m-%d").to_string();
        }
        let record = Application {
            id: id.clone(),
            submitted_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            form,
        };

        apps.push(record.clone());
        self.cache.replace_applications(&apps)?;
        tracing::info!(%id, "application saved locally");

        let mirrored = match self.gateway.create(&record) {
            Ok(remote_id) => {
                tracing::debug!(%id, %remote_id, "application mirrored to remote");
                self.flush_outbox()?;
                true
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "remote unreachable, application kept locally");
                self.enqueue(&id, Mutation::Upsert { record })?;
                false
            }
        };

        Ok(SaveOutcome { id, mirrored })
    }

    /// Remote set when reachable (and the cache is replaced with it),
    /// otherwise the cached set.
    pub fn list(&mut self) -> Vec<Application> {
        let cached = self.cache.applications();

        if !self.cache.outbox().is_empty() {
            match self.flush_outbox() {
                Ok(report) if !report.reachable => return cached,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "could not record outbox progress");
                    return cached;
                }
            }
        }

        match self.gateway.list() {
            Ok(remote) => {
                let merged = self.overlay_pending(remote);
                if let Err(e) = self.cache.replace_applications(&merged) {
                    tracing::warn!(error = %e, "failed to refresh cache from remote");
                }
                merged
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote unreachable, serving cached applications");
                cached
            }
        }
    }

    pub fn search(&mut self, query: &str) -> Vec<Application> {
        let all = self.list();
        filter_applications(all, query)
    }

    pub fn search_tagged(&mut self, ticket: SearchTicket, query: &str) -> SearchResponse {
        SearchResponse {
            ticket,
            query: query.to_string(),
            records: self.search(query),
        }
    }

    pub fn delete(&mut self, id: &str) -> Result<DeleteOutcome> {
        let mut apps = self.cache.applications();
        let before = apps.len();
        apps.retain(|a| a.id != id);
        let removed = apps.len() != before;
        if removed {
            self.cache.replace_applications(&apps)?;
        }
        // A queued upsert would bring the record back on the next replay.
        self.dequeue(id)?;
        tracing::info!(%id, removed, "application deleted locally");

        let mirrored = match self.gateway.delete(id) {
            Ok(()) => true,
            Err(e) if e.is_not_found() => true,
            Err(e) => {
                tracing::warn!(%id, error = %e, "remote unreachable, delete applied locally only");
                self.enqueue(id, Mutation::Delete)?;
                false
            }
        };

        Ok(DeleteOutcome { removed, mirrored })
    }

    /// Replay queued mutations in order. An unreachable remote stops the
    /// replay; an entry the remote refuses stays queued and the rest go on.
    pub fn flush_outbox(&mut self) -> Result<FlushReport> {
        let pending = self.cache.outbox();
        let total = pending.len();
        let mut kept = Vec::new();
        let mut replayed = 0;
        let mut refused = 0;
        let mut reachable = true;

        for entry in pending {
            if !reachable {
                kept.push(entry);
                continue;
            }
            let result = match &entry.mutation {
                Mutation::Upsert { record } => self.gateway.create(record).map(|_| ()),
                Mutation::Delete => match self.gateway.delete(&entry.id) {
                    Err(e) if e.is_not_found() => Ok(()),
                    other => other,
                },
            };
            match result {
                Ok(()) => replayed += 1,
                Err(e) if e.is_unreachable() => {
                    tracing::warn!(id = %entry.id, error = %e, "outbox replay stopped");
                    reachable = false;
                    kept.push(entry);
                }
                Err(e) => {
                    tracing::warn!(id = %entry.id, error = %e, "remote refused queued change, keeping it");
                    refused += 1;
                    kept.push(entry);
                }
            }
        }

        if kept.len() != total {
            self.cache.replace_outbox(&kept)?;
            tracing::info!(replayed, remaining = kept.len(), "outbox replayed");
        }

        Ok(FlushReport {
            replayed,
            refused,
            remaining: kept.len(),
            reachable,
        })
    }

    pub fn pending_entries(&self) -> Vec<OutboxEntry> {
        self.cache.outbox()
    }

    /// Drop a queued mutation without sending it. Returns false if nothing
    /// was queued for `id`.
    pub fn discard_pending(&mut self, id: &str) -> Result<bool> {
        let before = self.pending();
        self.dequeue(id)?;
        let discarded = self.pending() != before;
        if discarded {
            tracing::info!(%id, "discarded queued change");
        }
        Ok(discarded)
    }

    /// Unacknowledged local mutations win over the remote set.
    fn overlay_pending(&self, mut remote: Vec<Application>) -> Vec<Application> {
        for entry in self.cache.outbox() {
            match entry.mutation {
                Mutation::Upsert { record } => {
                    if !remote.iter().any(|a| a.id == record.id) {
                        remote.push(record);
                    }
                }
                Mutation::Delete => remote.retain(|a| a.id != entry.id),
            }
        }
        remote
    }

    pub fn pending(&self) -> usize {
        self.cache.outbox().len()
    }

    fn enqueue(&mut self, id: &str, mutation: Mutation) -> Result<()> {
        if !self.policy.replay_outbox {
            return Ok(());
        }
        let mut pending = self.cache.outbox();
        pending.retain(|e| e.id != id);
        pending.push(OutboxEntry {
            id: id.to_string(),
            mutation,
            queued_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        self.cache.replace_outbox(&pending)
    }

    fn dequeue(&mut self, id: &str) -> Result<()> {
        let mut pending = self.cache.outbox();
        let before = pending.len();
        pending.retain(|e| e.id != id);
        if pending.len() != before {
            self.cache.replace_outbox(&pending)?;
        }
        Ok(())
    }

    // --- Jobs & interviews (local only) ---

    pub fn jobs(&mut self) -> Result<Vec<Job>> {
        self.cache.jobs()
    }

    pub fn add_job(&mut self, title: &str, department: &str, status: &str) -> Result<Job> {
        let mut jobs = self.cache.jobs()?;
        let id = next_id("JOB", Utc::now().timestamp_millis(), |candidate| {
            jobs.iter().any(|j| j.id == candidate)
        });
        let job = Job {
            id,
            title: title.to_string(),
            department: department.to_string(),
            status: status.to_string(),
            applicants: 0,
        };
        jobs.push(job.clone());
        self.cache.replace_jobs(&jobs)?;
        Ok(job)
    }

    pub fn interviews(&mut self) -> Result<Vec<Interview>> {
        self.cache.interviews()
    }

    pub fn add_interview(
        &mut self,
        name: &str,
        role: &str,
        date: &str,
        time: &str,
        kind: &str,
    ) -> Result<Interview> {
        let mut interviews = self.cache.interviews()?;
        let id = next_id("INT", Utc::now().timestamp_millis(), |candidate| {
            interviews.iter().any(|i| i.id == candidate)
        });
        let interview = Interview {
            id,
            name: name.to_string(),
            role: role.to_string(),
            time: time.to_string(),
            date: date.to_string(),
            kind: kind.to_string(),
            status: "Scheduled".to_string(),
        };
        interviews.push(interview.clone());
        self.cache.replace_interviews(&interviews)?;
        Ok(interview)
    }

    // --- Admin session ---

    pub fn is_authenticated(&self) -> bool {
        self.cache.session_active()
    }

    pub fn begin_session(&mut self) -> Result<()> {
        self.cache.set_session()
    }

    pub fn end_session(&mut self) -> Result<()> {
        self.cache.clear_session()
    }
}

/// `<prefix>-<millis>`, bumped until it does not collide with an existing id.
fn next_id(prefix: &str, millis: i64, taken: impl Fn(&str) -> bool) -> String {
    let mut n = millis;
    loop {
        let candidate = format!("{}-{}", prefix, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Case-insensitive on names, email and employee code; mobile is matched as-is.
pub fn filter_applications(apps: Vec<Application>, query: &str) -> Vec<Application> {
    let query = query.trim();
    if query.is_empty() {
        return apps;
    }
    let needle = query.to_lowercase();
    apps.into_iter()
        .filter(|app| {
            let form = &app.form;
            form.first_name.to_lowercase().contains(&needle)
                || form.last_name.to_lowercase().contains(&needle)
                || form.email.to_lowercase().contains(&needle)
                || form.employee_code.to_lowercase().contains(&needle)
                || form.mobile.contains(query)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeRemote;

    fn form(code: &str, first: &str, last: &str, email: &str, mobile: &str) -> JoiningForm {
        JoiningForm {
            employee_code: code.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            mobile: mobile.to_string(),
            final_declaration: true,
            ..Default::default()
        }
    }

    fn coordinator(remote: &FakeRemote, replay_outbox: bool) -> SyncCoordinator {
        SyncCoordinator::new(
            LocalCache::in_memory(),
            Box::new(remote.clone()),
            SyncPolicy { replay_outbox },
        )
    }

    fn ids(apps: &[Application]) -> Vec<String> {
        apps.iter().map(|a| a.id.clone()).collect()
    }

    #[test]
    fn test_save_then_list_offline_contains_record() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);

        let outcome = sync
            .save(form("BCS-1", "Ansh", "Verma", "ansh@example.com", "9876543210"))
            .unwrap();
        assert!(!outcome.mirrored);
        assert!(outcome.id.starts_with("APP-"));

        let apps = sync.list();
        assert_eq!(ids(&apps), vec![outcome.id]);
        assert!(!apps[0].submitted_at.is_empty());
    }

    #[test]
    fn test_save_online_mirrors_to_remote() {
        let remote = FakeRemote::online();
        let mut sync = coordinator(&remote, true);

        let outcome = sync.save(form("BCS-2", "Ria", "Das", "ria@example.com", "1")).unwrap();
        assert!(outcome.mirrored);
        assert_eq!(ids(&remote.records()), vec![outcome.id.clone()]);
        assert_eq!(sync.pending(), 0);
        assert_eq!(ids(&sync.list()), vec![outcome.id]);
    }

    #[test]
    fn test_save_defaults_submission_date() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);

        sync.save(form("BCS-3", "A", "B", "a@b.c", "1")).unwrap();
        let mut dated = form("BCS-4", "C", "D", "c@d.e", "2");
        dated.submission_date = "2025-12-31".to_string();
        sync.save(dated).unwrap();

        let apps = sync.list();
        assert_eq!(apps[0].form.submission_date, Utc::now().format("%Y-%m-%d").to_string());
        assert_eq!(apps[1].form.submission_date, "2025-12-31");
    }

    #[test]
    fn test_rapid_saves_get_distinct_ids() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, false);

        let mut seen = std::collections::HashSet::new();
        for i in 0..20 {
            let outcome = sync.save(form(&format!("BCS-{}", i), "X", "Y", "x@y.z", "0")).unwrap();
            assert!(seen.insert(outcome.id));
        }
        assert_eq!(sync.list().len(), 20);
    }

    #[test]
    fn test_delete_offline_removes_from_every_list() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);

        let a = sync.save(form("BCS-1", "Ansh", "V", "a@x.com", "1")).unwrap();
        let b = sync.save(form("BCS-2", "Bela", "W", "b@x.com", "2")).unwrap();

        let outcome = sync.delete(&a.id).unwrap();
        assert!(outcome.removed);
        assert!(!outcome.mirrored);

        assert_eq!(ids(&sync.list()), vec![b.id.clone()]);
        assert_eq!(ids(&sync.search("")), vec![b.id]);
    }

    #[test]
    fn test_delete_unknown_id_reports_not_removed() {
        let remote = FakeRemote::online();
        let mut sync = coordinator(&remote, true);
        let outcome = sync.delete("APP-nope").unwrap();
        assert!(!outcome.removed);
        assert!(outcome.mirrored);
    }

    #[test]
    fn test_empty_search_equals_list() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);
        sync.save(form("BCS-1", "Ansh", "V", "a@x.com", "1")).unwrap();
        sync.save(form("BCS-2", "Bela", "W", "b@x.com", "2")).unwrap();

        assert_eq!(sync.search(""), sync.list());
        assert_eq!(sync.search("   "), sync.list());
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);
        let ansh = sync.save(form("BCS-1", "Ansh", "Verma", "av@x.com", "9000011111")).unwrap();
        let hans = sync.save(form("BCS-2", "Kiran", "Hansraj", "kh@x.com", "9000022222")).unwrap();
        let other = sync.save(form("XYZ-3", "Mohit", "Rao", "MOHIT@Corp.com", "8000033333")).unwrap();

        assert_eq!(ids(&sync.search("ans")), vec![ansh.id.clone(), hans.id.clone()]);
        assert_eq!(ids(&sync.search("ANS")), vec![ansh.id.clone(), hans.id.clone()]);
        assert_eq!(ids(&sync.search("mohit@corp")), vec![other.id.clone()]);
        assert_eq!(ids(&sync.search("bcs-2")), vec![hans.id]);
        assert_eq!(ids(&sync.search("80000")), vec![other.id]);
        assert!(sync.search("nobody").is_empty());
    }

    #[test]
    fn test_online_list_replaces_cache_with_remote() {
        let remote = FakeRemote::online();
        let mut sync = coordinator(&remote, true);
        sync.save(form("BCS-1", "Local", "Only", "l@x.com", "1")).unwrap();

        let stranger = Application {
            id: "77".to_string(),
            submitted_at: String::new(),
            form: form("BCS-77", "Remote", "Row", "r@x.com", "7"),
        };
        remote.seed(vec![stranger.clone()]);

        assert_eq!(sync.list(), vec![stranger.clone()]);
        remote.set_online(false);
        assert_eq!(sync.list(), vec![stranger]);
    }

    #[test]
    fn test_offline_write_is_lost_without_outbox() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, false);

        let a = sync.save(form("BCS-1", "Ansh", "V", "a@x.com", "1")).unwrap();
        assert_eq!(ids(&sync.list()), vec![a.id]);
        assert_eq!(sync.pending(), 0);

        remote.set_online(true);
        assert!(sync.list().is_empty());
        assert!(remote.records().is_empty());
    }

    #[test]
    fn test_offline_write_is_replayed_with_outbox() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);

        let a = sync.save(form("BCS-1", "Ansh", "V", "a@x.com", "1")).unwrap();
        assert_eq!(sync.pending(), 1);

        remote.set_online(true);
        assert_eq!(ids(&sync.list()), vec![a.id.clone()]);
        assert_eq!(ids(&remote.records()), vec![a.id]);
        assert_eq!(sync.pending(), 0);
    }

    #[test]
    fn test_offline_delete_is_replayed_with_outbox() {
        let remote = FakeRemote::online();
        let mut sync = coordinator(&remote, true);
        let a = sync.save(form("BCS-1", "Ansh", "V", "a@x.com", "1")).unwrap();

        remote.set_online(false);
        sync.delete(&a.id).unwrap();
        assert_eq!(sync.pending(), 1);
        assert_eq!(remote.records().len(), 1);

        remote.set_online(true);
        assert!(sync.list().is_empty());
        assert!(remote.records().is_empty());
        assert_eq!(remote.deletes(), 1);
        assert_eq!(sync.pending(), 0);
    }

    #[test]
    fn test_refused_entry_does_not_block_remote_refresh() {
        let remote = FakeRemote::online();
        let mut sync = coordinator(&remote, true);
        remote.set_online(false);
        let a = sync.save(form("BCS-1", "Ansh", "V", "a@x.com", "1")).unwrap();
        remote.refuse(&a.id);
        remote.set_online(true);

        let mut other = sync.list()[0].clone();
        other.id = "99".to_string();
        remote.seed(vec![other]);

        for _ in 0..3 {
            let listed = ids(&sync.list());
            assert!(listed.contains(&"99".to_string()));
            assert!(listed.contains(&a.id));
        }
        assert_eq!(remote.lists(), 4);
        assert_eq!(sync.pending(), 1);

        let report = sync.flush_outbox().unwrap();
        assert_eq!(report, FlushReport { replayed: 0, refused: 1, remaining: 1, reachable: true });

        remote.accept_all();
        sync.list();
        assert_eq!(sync.pending(), 0);
        assert!(remote.records().iter().any(|r| r.id == a.id));
    }

    #[test]
    fn test_refused_entry_does_not_hold_back_later_ones() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);
        let a = sync.save(form("BCS-1", "A", "A", "a@x.com", "1")).unwrap();
        let b = sync.save(form("BCS-2", "B", "B", "b@x.com", "2")).unwrap();
        remote.refuse(&a.id);
        remote.set_online(true);

        let report = sync.flush_outbox().unwrap();
        assert_eq!(report, FlushReport { replayed: 1, refused: 1, remaining: 1, reachable: true });
        assert_eq!(ids(&remote.records()), vec![b.id]);
        assert_eq!(sync.pending_entries()[0].id, a.id);
    }

    #[test]
    fn test_discard_pending_drops_entry() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);
        let a = sync.save(form("BCS-1", "A", "A", "a@x.com", "1")).unwrap();

        assert!(sync.discard_pending(&a.id).unwrap());
        assert!(!sync.discard_pending(&a.id).unwrap());
        assert_eq!(sync.pending(), 0);
        remote.set_online(true);
        sync.flush_outbox().unwrap();
        assert_eq!(remote.creates(), 0);
    }

    #[test]
    fn test_delete_of_unsynced_record_does_not_resurrect_it() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);
        let a = sync.save(form("BCS-1", "Ansh", "V", "a@x.com", "1")).unwrap();
        sync.delete(&a.id).unwrap();
        assert_eq!(sync.pending(), 1);

        remote.set_online(true);
        let report = sync.flush_outbox().unwrap();
        assert_eq!(report, FlushReport { replayed: 1, refused: 0, remaining: 0, reachable: true });
        assert_eq!(remote.creates(), 0);
        assert!(sync.list().is_empty());
    }

    #[test]
    fn test_successful_save_flushes_earlier_backlog() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);
        let a = sync.save(form("BCS-1", "A", "A", "a@x.com", "1")).unwrap();

        remote.set_online(true);
        let b = sync.save(form("BCS-2", "B", "B", "b@x.com", "2")).unwrap();
        assert!(b.mirrored);
        assert_eq!(sync.pending(), 0);
        let mut remote_ids = ids(&remote.records());
        remote_ids.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(remote_ids, expected);
    }

    #[test]
    fn test_flush_while_offline_keeps_entries() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);
        sync.save(form("BCS-1", "A", "A", "a@x.com", "1")).unwrap();
        sync.save(form("BCS-2", "B", "B", "b@x.com", "2")).unwrap();

        let report = sync.flush_outbox().unwrap();
        assert_eq!(report, FlushReport { replayed: 0, refused: 0, remaining: 2, reachable: false });
    }

    #[test]
    fn test_disabled_gateway_is_local_only() {
        let mut sync = SyncCoordinator::new(
            LocalCache::in_memory(),
            Box::new(DisabledGateway),
            SyncPolicy::default(),
        );
        let a = sync.save(form("BCS-1", "A", "A", "a@x.com", "1")).unwrap();
        assert!(!a.mirrored);
        assert_eq!(ids(&sync.list()), vec![a.id]);
    }

    #[test]
    fn test_sequencer_discards_stale_responses() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);
        sync.save(form("BCS-1", "Ansh", "V", "a@x.com", "1")).unwrap();

        let sequencer = SearchSequencer::new();
        let first = sequencer.dispatch();
        let second = sequencer.dispatch();
        assert!(second > first);

        // The later query resolves first; the earlier one lands afterwards.
        let newer = sync.search_tagged(second, "an");
        let older = sync.search_tagged(first, "a");
        assert!(sequencer.accept(&newer));
        assert!(!sequencer.accept(&older));
        assert_eq!(newer.query, "an");
    }

    #[test]
    fn test_jobs_and_interviews_are_seeded_and_appendable() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);
        assert_eq!(sync.jobs().unwrap().len(), 2);
        let job = sync.add_job("Payroll Analyst", "Finance", "Open").unwrap();
        assert!(job.id.starts_with("JOB-"));
        assert_eq!(sync.jobs().unwrap().len(), 3);

        assert_eq!(sync.interviews().unwrap().len(), 1);
        let interview = sync
            .add_interview("Neha", "Payroll Analyst", "2026-02-01", "11:00 AM", "In Person")
            .unwrap();
        assert_eq!(interview.status, "Scheduled");
        assert_eq!(sync.interviews().unwrap().len(), 2);
    }

    #[test]
    fn test_session_lifecycle() {
        let remote = FakeRemote::offline();
        let mut sync = coordinator(&remote, true);
        assert!(!sync.is_authenticated());
        sync.begin_session().unwrap();
        assert!(sync.is_authenticated());
        sync.end_session().unwrap();
        assert!(!sync.is_authenticated());
    }

    #[test]
    fn test_outbox_entry_wire_format() {
        let entry = OutboxEntry {
            id: "APP-1".to_string(),
            mutation: Mutation::Delete,
            queued_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["mutation"]["op"], "delete");
        let back: OutboxEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
