// gachabot-core/src/test_utils/fakes.rs

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use gachabot_common::models::{BannerSnapshot, MessageBody, ThreadInfo};
use gachabot_common::traits::{Notifier, SnapshotSource};
use gachabot_common::Error;

#[derive(Debug, Clone)]
pub struct CreatedThread {
    pub category: String,
    pub title: String,
    pub thread_id: i64,
    pub starter_message_id: i64,
}

/// Records every actuation call; ids are handed out sequentially. Tests can
/// script a number of upcoming create_thread failures and prime thread
/// listings and reaction sets.
#[derive(Default)]
pub struct RecordingNotifier {
    next_id: AtomicI64,
    fail_creates: AtomicUsize,
    pub created: Mutex<Vec<CreatedThread>>,
    pub renames: Mutex<Vec<(i64, String)>>,
    pub archived: Mutex<Vec<(i64, String)>>,
    pub posts: Mutex<Vec<(i64, MessageBody)>>,
    pub edits: Mutex<Vec<(i64, i64, MessageBody)>>,
    pub reactions_added: Mutex<Vec<(i64, i64, String)>>,
    reactions: Mutex<HashMap<(i64, i64), HashSet<String>>>,
    listings: Mutex<HashMap<i64, Vec<ThreadInfo>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            ..Self::default()
        }
    }

    /// The next `n` create_thread calls fail with an actuation error.
    pub fn fail_next_creates(&self, n: usize) {
        self.fail_creates.store(n, Ordering::SeqCst);
    }

    pub fn prime_listing(&self, channel_id: i64, threads: Vec<ThreadInfo>) {
        self.listings.lock().unwrap().insert(channel_id, threads);
    }

    pub fn prime_reactions(&self, thread_id: i64, message_id: i64, markers: &[&str]) {
        self.reactions.lock().unwrap().insert(
            (thread_id, message_id),
            markers.iter().map(|m| m.to_string()).collect(),
        );
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn was_archived(&self, thread_id: i64) -> bool {
        self.archived
            .lock()
            .unwrap()
            .iter()
            .any(|(t, _)| *t == thread_id)
    }

    /// Text posts to one thread (probability lines, stock comments,
    /// claim replies).
    pub fn text_posts(&self, thread_id: i64) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == thread_id)
            .filter_map(|(_, body)| body.content.clone())
            .collect()
    }

    fn next(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn create_thread(
        &self,
        category: &str,
        title: &str,
        _body: &MessageBody,
    ) -> Result<(i64, i64), Error> {
        let pending = self.fail_creates.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_creates.store(pending - 1, Ordering::SeqCst);
            return Err(Error::Actuation("scripted create_thread failure".into()));
        }
        let thread_id = self.next();
        let starter_message_id = self.next();
        self.created.lock().unwrap().push(CreatedThread {
            category: category.to_string(),
            title: title.to_string(),
            thread_id,
            starter_message_id,
        });
        Ok((thread_id, starter_message_id))
    }

    async fn rename_thread(&self, thread_id: i64, new_title: &str) -> Result<(), Error> {
        self.renames
            .lock()
            .unwrap()
            .push((thread_id, new_title.to_string()));
        Ok(())
    }

    async fn archive_thread(&self, thread_id: i64, closing_message: &str) -> Result<(), Error> {
        self.archived
            .lock()
            .unwrap()
            .push((thread_id, closing_message.to_string()));
        Ok(())
    }

    async fn post_message(&self, thread_id: i64, body: &MessageBody) -> Result<i64, Error> {
        self.posts.lock().unwrap().push((thread_id, body.clone()));
        Ok(self.next())
    }

    async fn edit_message(
        &self,
        thread_id: i64,
        message_id: i64,
        body: &MessageBody,
    ) -> Result<(), Error> {
        self.edits
            .lock()
            .unwrap()
            .push((thread_id, message_id, body.clone()));
        Ok(())
    }

    async fn add_reaction(
        &self,
        thread_id: i64,
        message_id: i64,
        marker: &str,
    ) -> Result<(), Error> {
        self.reactions_added
            .lock()
            .unwrap()
            .push((thread_id, message_id, marker.to_string()));
        self.reactions
            .lock()
            .unwrap()
            .entry((thread_id, message_id))
            .or_default()
            .insert(marker.to_string());
        Ok(())
    }

    async fn read_reactions(
        &self,
        thread_id: i64,
        message_id: i64,
    ) -> Result<HashSet<String>, Error> {
        Ok(self
            .reactions
            .lock()
            .unwrap()
            .get(&(thread_id, message_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_threads(
        &self,
        channel_id: i64,
        _include_archived: bool,
    ) -> Result<Vec<ThreadInfo>, Error> {
        Ok(self
            .listings
            .lock()
            .unwrap()
            .get(&channel_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// One scripted step of a snapshot source.
pub enum SourceScript {
    Ok(Vec<BannerSnapshot>),
    Fail(String),
    /// Never completes; used to exercise the timeout path.
    Hang,
}

pub struct ScriptedSource {
    steps: Mutex<VecDeque<SourceScript>>,
    closed: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<SourceScript>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            closed: AtomicUsize::new(0),
        }
    }

    /// How many times the session was released.
    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<BannerSnapshot>, Error> {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(SourceScript::Ok(snapshot)) => Ok(snapshot),
            Some(SourceScript::Fail(msg)) => Err(Error::Source(msg)),
            Some(SourceScript::Hang) => {
                tokio::time::sleep(Duration::from_secs(7 * 24 * 3600)).await;
                Err(Error::Source("hung fetch woke up".into()))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
