//! Playback session engine
//!
//! [`WeaveEngine`] ties the selector, the reweight scheduler, the exhaustion
//! policy and the sequence planner to a storage context and a content
//! provider. Every timer is evaluated lazily against the injected clock when
//! a call comes in; the engine never spawns work of its own.

use crate::config::EngineConfig;
use crate::exhaustion::{self, DrawState, Resolution};
use crate::materializer::{materialize, reachable_pools};
use crate::pool_names::PoolNameCache;
use crate::reweight::{self, ReweightOutcome};
use crate::selector;
use crate::sequence::{self as stages, StageStep};
use crate::session::SessionStore;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use weave_core::storage::{DefinitionFilter, SequenceFilter, SessionFilter, SessionItemFilter};
use weave_core::types::validate_weights;
use weave_core::*;

/// A freshly started session together with its first item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    pub session: PlaybackSession,
    pub item: DrawnItem,
}

/// Weighted multi-pool playback engine
pub struct WeaveEngine {
    storage: Arc<dyn StorageContext>,
    provider: Arc<dyn ContentProvider>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    pool_names: PoolNameCache,
    rng: Mutex<StdRng>,
}

impl WeaveEngine {
    /// Create an engine on the system clock with an entropy-seeded RNG
    pub fn new(
        storage: Arc<dyn StorageContext>,
        provider: Arc<dyn ContentProvider>,
        config: EngineConfig,
    ) -> Self {
        let pool_names =
            PoolNameCache::new(config.pool_name_cache_capacity, config.pool_name_cache_ttl);
        Self {
            storage,
            provider,
            clock: Arc::new(SystemClock),
            config,
            pool_names,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Make draws reproducible
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn sessions(&self) -> SessionStore<'_> {
        SessionStore::new(self.storage.as_ref())
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    /// Validate and store a new blend definition
    pub async fn create_definition(
        &self,
        owner_id: &UserId,
        draft: CreateBlendDefinition,
    ) -> Result<BlendDefinition> {
        let definition = draft.into_definition(owner_id.clone(), self.now())?;
        self.storage.definitions().insert(&definition).await?;

        info!(
            blend = %definition.id,
            owner = %owner_id,
            pools = definition.pools.len(),
            rules = definition.scheduled_reweights.len(),
            "Created blend definition"
        );
        Ok(definition)
    }

    /// Load a definition owned by `owner_id`
    pub async fn definition(&self, id: &BlendId, owner_id: &UserId) -> Result<BlendDefinition> {
        self.storage
            .definitions()
            .find_one(&DefinitionFilter::by_id(id).owned_by(owner_id))
            .await?
            .ok_or_else(|| WeaveError::DefinitionNotFound(id.clone()))
    }

    /// All definitions of an owner
    pub async fn list_definitions(&self, owner_id: &UserId) -> Result<Vec<BlendDefinition>> {
        self.storage
            .definitions()
            .find(&DefinitionFilter::by_owner(owner_id))
            .await
    }

    /// Replace a definition's active weights
    pub async fn update_weights(
        &self,
        id: &BlendId,
        owner_id: &UserId,
        pools: Vec<PoolWeight>,
    ) -> Result<BlendDefinition> {
        validate_weights(&pools)?;

        let mut definition = self.definition(id, owner_id).await?;
        definition.pools = pools;
        definition.updated_at = self.now();
        definition.validate()?;

        if !self.storage.definitions().update(&definition).await? {
            return Err(WeaveError::DefinitionNotFound(id.clone()));
        }

        info!(blend = %id, "Updated blend weights");
        Ok(definition)
    }

    /// Replace a definition's editable fields with a fresh draft.
    ///
    /// The draft is sorted and validated like a new definition; id, owner
    /// and creation time survive. Running sessions keep their materialized
    /// items and pick up the new weights on their next draw.
    pub async fn update_definition(
        &self,
        id: &BlendId,
        owner_id: &UserId,
        draft: CreateBlendDefinition,
    ) -> Result<BlendDefinition> {
        let mut definition = self.definition(id, owner_id).await?;
        definition.apply_draft(draft, self.now())?;

        if !self.storage.definitions().update(&definition).await? {
            return Err(WeaveError::DefinitionNotFound(id.clone()));
        }

        info!(blend = %id, pools = definition.pools.len(), "Updated blend definition");
        Ok(definition)
    }

    /// Delete a definition and end every session playing it
    pub async fn delete_definition(&self, id: &BlendId, owner_id: &UserId) -> Result<()> {
        self.definition(id, owner_id).await?;

        let filter = SessionFilter {
            owner_id: Some(owner_id.clone()),
            blend_id: Some(id.clone()),
            ..SessionFilter::default()
        };
        let ended = self.end_matching(&filter).await?;

        self.storage
            .definitions()
            .delete(&DefinitionFilter::by_id(id).owned_by(owner_id))
            .await?;

        info!(blend = %id, sessions_ended = ended, "Deleted blend definition");
        Ok(())
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    /// Validate and store a new sequence; every stage must name one of the owner's blends
    pub async fn create_sequence(
        &self,
        owner_id: &UserId,
        draft: CreateSequence,
    ) -> Result<Sequence> {
        let sequence = draft.into_sequence(owner_id.clone(), self.now())?;
        for stage in &sequence.stages {
            self.definition(&stage.blend_id, owner_id).await?;
        }

        self.storage.sequences().insert(&sequence).await?;

        info!(sequence = %sequence.id, stages = sequence.len(), "Created sequence");
        Ok(sequence)
    }

    /// Load a sequence owned by `owner_id`
    pub async fn sequence(&self, id: &SequenceId, owner_id: &UserId) -> Result<Sequence> {
        self.storage
            .sequences()
            .find_one(&SequenceFilter::by_id(id).owned_by(owner_id))
            .await?
            .ok_or_else(|| WeaveError::SequenceNotFound(id.clone()))
    }

    /// All sequences of an owner
    pub async fn list_sequences(&self, owner_id: &UserId) -> Result<Vec<Sequence>> {
        self.storage
            .sequences()
            .find(&SequenceFilter::by_owner(owner_id))
            .await
    }

    /// Replace a sequence's name and stages.
    ///
    /// Every stage blend must still belong to `owner_id`. Sessions playing
    /// the old stage layout are ended.
    pub async fn update_sequence(
        &self,
        id: &SequenceId,
        owner_id: &UserId,
        draft: CreateSequence,
    ) -> Result<Sequence> {
        let mut sequence = self.sequence(id, owner_id).await?;
        sequence.apply_draft(draft)?;
        for stage in &sequence.stages {
            self.definition(&stage.blend_id, owner_id).await?;
        }

        if !self.storage.sequences().update(&sequence).await? {
            return Err(WeaveError::SequenceNotFound(id.clone()));
        }

        let filter = SessionFilter {
            owner_id: Some(owner_id.clone()),
            sequence_id: Some(id.clone()),
            ..SessionFilter::default()
        };
        let ended = self.end_matching(&filter).await?;

        info!(sequence = %id, stages = sequence.len(), sessions_ended = ended, "Updated sequence");
        Ok(sequence)
    }

    /// Delete a sequence and end every session playing it
    pub async fn delete_sequence(&self, id: &SequenceId, owner_id: &UserId) -> Result<()> {
        self.sequence(id, owner_id).await?;

        let filter = SessionFilter {
            owner_id: Some(owner_id.clone()),
            sequence_id: Some(id.clone()),
            ..SessionFilter::default()
        };
        let ended = self.end_matching(&filter).await?;

        self.storage
            .sequences()
            .delete(&SequenceFilter::by_id(id).owned_by(owner_id))
            .await?;

        info!(sequence = %id, sessions_ended = ended, "Deleted sequence");
        Ok(())
    }

    // ========================================================================
    // Blend sessions
    // ========================================================================

    /// Start a session on a blend and draw its first item.
    ///
    /// If populating the session or the first draw fails, the session is
    /// removed again before the error is returned.
    pub async fn start_session(&self, blend_id: &BlendId, owner_id: &UserId) -> Result<SessionStart> {
        let mut definition = self.definition(blend_id, owner_id).await?;
        let mut session = PlaybackSession::new(blend_id.clone(), owner_id.clone(), self.now());

        self.sessions().create(&session).await?;
        info!(session = %session.id, blend = %blend_id, owner = %owner_id, "Starting session");

        match self.populate_and_draw(&mut session, &mut definition).await {
            Ok(item) => Ok(SessionStart { session, item }),
            Err(e) => {
                self.rollback(&session.id, &e).await;
                Err(e)
            }
        }
    }

    async fn populate_and_draw(
        &self,
        session: &mut PlaybackSession,
        definition: &mut BlendDefinition,
    ) -> Result<DrawnItem> {
        materialize(
            self.provider.as_ref(),
            self.storage.as_ref(),
            definition,
            &session.id,
        )
        .await?;
        self.draw(session, definition).await
    }

    async fn rollback(&self, session_id: &SessionId, cause: &WeaveError) {
        warn!(session = %session_id, error = %cause, "Session start failed, rolling back");
        if let Err(e) = self.sessions().destroy(session_id).await {
            warn!(session = %session_id, error = %e, "Rollback failed");
        }
    }

    /// Draw the next item of a session.
    ///
    /// Sessions that play a sequence go through the stage planner.
    pub async fn next_item(&self, session_id: &SessionId, owner_id: &UserId) -> Result<DrawnItem> {
        let mut session = self.sessions().load_owned(session_id, owner_id).await?;
        if session.sequence.is_some() {
            return self.next_in_sequence(session).await;
        }

        let mut definition = self.definition(&session.blend_id, &session.owner_id).await?;
        self.draw(&mut session, &mut definition).await
    }

    /// Load a session owned by `owner_id`
    pub async fn session(&self, session_id: &SessionId, owner_id: &UserId) -> Result<PlaybackSession> {
        self.sessions().load_owned(session_id, owner_id).await
    }

    /// Clear every played flag; the session keeps its identity and start time
    pub async fn reset_session(&self, session_id: &SessionId) -> Result<()> {
        let store = self.sessions();
        let mut session = store.load(session_id).await?;
        let cleared = store.clear_played(session_id).await?;
        store.touch(&mut session, self.now()).await?;

        info!(session = %session_id, cleared, "Reset session");
        Ok(())
    }

    /// Restrict draws to one pool (`None` lifts the restriction).
    ///
    /// The restriction takes effect on blends with single-pool lock enabled.
    pub async fn lock_pool(
        &self,
        session_id: &SessionId,
        owner_id: &UserId,
        pool_id: Option<PoolId>,
    ) -> Result<PlaybackSession> {
        let store = self.sessions();
        let mut session = store.load_owned(session_id, owner_id).await?;
        let definition = self.definition(&session.blend_id, owner_id).await?;

        if let Some(pool) = &pool_id {
            if !reachable_pools(&definition).contains(pool) {
                return Err(WeaveError::invalid_input(format!(
                    "pool {pool} is not part of blend {}",
                    definition.id
                )));
            }
        }
        if pool_id.is_some() && !definition.single_pool_lock {
            debug!(blend = %definition.id, "Pool lock recorded but blend has single-pool lock off");
        }

        session.current_pool_id = pool_id;
        store.touch(&mut session, self.now()).await?;

        info!(session = %session_id, pool = ?session.current_pool_id, "Set pool lock");
        Ok(session)
    }

    /// Every item of a session with its played flag and pool name
    pub async fn session_items(
        &self,
        session_id: &SessionId,
        owner_id: &UserId,
    ) -> Result<Vec<SessionTrack>> {
        let session = self.sessions().load_owned(session_id, owner_id).await?;
        let items = self
            .storage
            .session_items()
            .find(&SessionItemFilter::session(&session.id))
            .await?;

        let now = self.now();
        let mut names: HashMap<PoolId, String> = HashMap::new();
        for item in &items {
            if !names.contains_key(&item.pool_id) {
                let name = self
                    .pool_names
                    .resolve(self.provider.as_ref(), &item.pool_id, now)
                    .await;
                names.insert(item.pool_id.clone(), name);
            }
        }

        Ok(items
            .into_iter()
            .map(|item| SessionTrack {
                pool_name: names.get(&item.pool_id).cloned().unwrap_or_default(),
                item,
            })
            .collect())
    }

    /// End a session; returns false if there was nothing to end
    pub async fn end_session(&self, session_id: &SessionId, owner_id: &UserId) -> Result<bool> {
        let store = self.sessions();
        match store.load_owned(session_id, owner_id).await {
            Ok(_) => {
                let removed = store.destroy(session_id).await?;
                info!(session = %session_id, "Ended session");
                Ok(removed)
            }
            Err(WeaveError::SessionNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove sessions idle for longer than the configured timeout
    pub async fn purge_idle_sessions(&self) -> Result<u64> {
        let cutoff =
            self.now() - Duration::minutes(i64::from(self.config.session_idle_timeout_minutes));
        let removed = self.end_matching(&SessionFilter::idle_since(cutoff)).await?;

        if removed > 0 {
            info!(removed, cutoff = %cutoff, "Purged idle sessions");
        }
        Ok(removed)
    }

    async fn end_matching(&self, filter: &SessionFilter) -> Result<u64> {
        let store = self.sessions();
        let mut removed = 0;
        for session in self.storage.sessions().find(filter).await? {
            if store.destroy(&session.id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// One draw: reweight, pick, resolve exhaustion, mark played
    async fn draw(
        &self,
        session: &mut PlaybackSession,
        definition: &mut BlendDefinition,
    ) -> Result<DrawnItem> {
        let now = self.now();
        self.apply_reweight(definition, session, now).await?;

        let mut retries = 0;
        let mut item = loop {
            let picked = self.pick(session, definition).await?;
            let state = if picked.is_some() {
                DrawState::HasCandidates
            } else {
                DrawState::Exhausted
            };

            match (picked, exhaustion::resolve(state, definition.repeat_mode, retries)) {
                (Some(item), _) => break item,
                (None, Some(Resolution::ResetAndRetry)) => {
                    let cleared = self.sessions().clear_played(&session.id).await?;
                    info!(session = %session.id, cleared, "Blend exhausted, repeating");
                    retries += 1;
                }
                (None, _) => {
                    warn!(
                        session = %session.id,
                        repeat = %definition.repeat_mode,
                        "No unplayed items left"
                    );
                    return Err(WeaveError::Exhausted);
                }
            }
        };

        if self.config.enrich_items {
            self.enrich(&mut item).await;
        }
        item.played = true;
        self.storage.session_items().update(&item).await?;
        self.sessions().touch(session, now).await?;

        let pool_name = self
            .pool_names
            .resolve(self.provider.as_ref(), &item.pool_id, now)
            .await;

        debug!(
            session = %session.id,
            pool = %item.pool_id,
            track = %item.track_id,
            position = item.position,
            "Drew item"
        );

        Ok(DrawnItem {
            pool_id: item.pool_id.clone(),
            pool_name,
            crossfade_seconds: definition.crossfade_seconds,
            stage_index: session.stage_index(),
            item,
        })
    }

    async fn apply_reweight(
        &self,
        definition: &mut BlendDefinition,
        session: &mut PlaybackSession,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match reweight::apply_due(definition, session, self.config.reweight_scope, now)? {
            ReweightOutcome::Unchanged => {}
            ReweightOutcome::Definition { after_minutes } => {
                self.storage.definitions().update(definition).await?;
                info!(blend = %definition.id, after_minutes, "Applied scheduled reweight");
            }
            ReweightOutcome::Session { after_minutes } => {
                self.sessions().save(session).await?;
                info!(session = %session.id, after_minutes, "Applied scheduled reweight to session");
            }
        }
        Ok(())
    }

    /// Choose one unplayed item, or `None` if the eligible pools are empty
    async fn pick(
        &self,
        session: &PlaybackSession,
        definition: &BlendDefinition,
    ) -> Result<Option<SessionItem>> {
        let unplayed = self
            .storage
            .session_items()
            .find(&SessionItemFilter::session(&session.id).unplayed())
            .await?;
        if unplayed.is_empty() {
            return Ok(None);
        }

        let pool_id = match (&session.current_pool_id, definition.single_pool_lock) {
            (Some(locked), true) => locked.clone(),
            _ => {
                let weights = reweight::active_weights(definition, session, self.config.reweight_scope);
                let candidates = selector::candidates(weights, &unplayed);
                let r = self.random_point();
                match selector::choose_pool(&candidates, r) {
                    Some(index) => candidates[index].pool_id.clone(),
                    None => return Ok(None),
                }
            }
        };

        let in_pool: Vec<&SessionItem> = unplayed.iter().filter(|i| i.pool_id == pool_id).collect();
        let index = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            selector::pick_item(&in_pool, definition.playback_order, &mut *rng)
        };

        Ok(index.map(|i| in_pool[i].clone()))
    }

    fn random_point(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0.0..100.0)
    }

    async fn enrich(&self, item: &mut SessionItem) {
        match self.provider.item(&item.track_id).await {
            Ok(fresh) => item.refresh_metadata(fresh),
            Err(e) => {
                warn!(track = %item.track_id, error = %e, "Item lookup failed, keeping stored metadata");
            }
        }
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    /// Start stage 0 of a sequence and draw its first item
    pub async fn start_sequence(
        &self,
        sequence_id: &SequenceId,
        owner_id: &UserId,
    ) -> Result<SessionStart> {
        let sequence = self.sequence(sequence_id, owner_id).await?;
        let first = sequence
            .stage(0)
            .ok_or_else(|| WeaveError::invalid_input("sequence has no stages"))?;
        let mut definition = self.definition(&first.blend_id, owner_id).await?;

        let mut session = PlaybackSession::new(first.blend_id.clone(), owner_id.clone(), self.now());
        session.sequence = Some(SequenceLink {
            sequence_id: sequence.id.clone(),
            stage_index: 0,
            stage_time_limit_minutes: sequence.limit_for(0),
            transition: StageTransition::Playing,
        });

        self.sessions().create(&session).await?;
        info!(
            session = %session.id,
            sequence = %sequence.id,
            stages = sequence.len(),
            "Starting sequence"
        );

        let first_item = async {
            materialize(
                self.provider.as_ref(),
                self.storage.as_ref(),
                &definition,
                &session.id,
            )
            .await?;
            self.draw_in_stage(&sequence, &mut session, &mut definition).await
        }
        .await;

        match first_item {
            Ok(item) => Ok(SessionStart { session, item }),
            Err(e) => {
                self.rollback(&session.id, &e).await;
                Err(e)
            }
        }
    }

    /// Draw the next item of a sequence session, cutting stages as due
    pub async fn next_sequence_item(&self, session_id: &SessionId) -> Result<DrawnItem> {
        let session = self.sessions().load(session_id).await?;
        self.next_in_sequence(session).await
    }

    /// Move a sequence session to another stage.
    ///
    /// `immediate` cuts right away without drawing. Otherwise the cut is
    /// recorded and happens after one more item from the current stage.
    pub async fn switch_sequence_stage(
        &self,
        session_id: &SessionId,
        target: usize,
        immediate: bool,
    ) -> Result<()> {
        let mut session = self.sessions().load(session_id).await?;
        let link = sequence_link(&session)?.clone();
        let sequence = self.sequence(&link.sequence_id, &session.owner_id).await?;

        if target >= sequence.len() {
            return Err(WeaveError::invalid_input(format!(
                "stage {target} out of range for a {}-stage sequence",
                sequence.len()
            )));
        }

        if immediate {
            self.cut_to(&sequence, &mut session, target).await?;
        } else {
            if let Some(link) = session.sequence.as_mut() {
                link.transition = StageTransition::PendingAdvance { target };
            }
            self.sessions().save(&session).await?;
            info!(session = %session_id, from = link.stage_index, target, "Stage switch pending");
        }
        Ok(())
    }

    async fn next_in_sequence(&self, mut session: PlaybackSession) -> Result<DrawnItem> {
        let link = sequence_link(&session)?.clone();
        let sequence = self.sequence(&link.sequence_id, &session.owner_id).await?;
        let elapsed = session.elapsed(self.now());

        match stages::plan(&link, sequence.len(), elapsed) {
            StageStep::Cut { target } => {
                let mut definition = self.cut_to(&sequence, &mut session, target).await?;
                self.draw_in_stage(&sequence, &mut session, &mut definition)
                    .await
            }
            StageStep::Draw => {
                let mut definition = self.definition(&session.blend_id, &session.owner_id).await?;
                self.draw_in_stage(&sequence, &mut session, &mut definition)
                    .await
            }
            StageStep::DrawThenArm { target } => {
                let mut definition = self.definition(&session.blend_id, &session.owner_id).await?;
                let item = self
                    .draw_in_stage(&sequence, &mut session, &mut definition)
                    .await?;

                // An exhausted stage may already have cut over while drawing
                let pending = StageTransition::PendingAdvance { target };
                if let Some(link) = session.sequence.as_mut().filter(|l| l.transition == pending) {
                    link.transition = StageTransition::Advancing { target };
                    self.sessions().save(&session).await?;
                    debug!(session = %session.id, target, "Stage cut armed");
                }
                Ok(item)
            }
        }
    }

    /// Draw from the current stage, moving on while stages run dry
    async fn draw_in_stage(
        &self,
        sequence: &Sequence,
        session: &mut PlaybackSession,
        definition: &mut BlendDefinition,
    ) -> Result<DrawnItem> {
        loop {
            match self.draw(session, definition).await {
                Err(WeaveError::Exhausted) => {
                    let next = session
                        .sequence
                        .as_ref()
                        .and_then(|link| stages::on_stage_exhausted(link, sequence.len()));

                    let Some(target) = next else {
                        info!(session = %session.id, sequence = %sequence.id, "Sequence completed");
                        return Err(WeaveError::SequenceCompleted(sequence.id.clone()));
                    };

                    info!(session = %session.id, target, "Stage exhausted early, advancing");
                    *definition = self.cut_to(sequence, session, target).await?;
                }
                other => return other,
            }
        }
    }

    /// Replace the session's stage with `target` and populate it; no draw.
    ///
    /// The session is marked `Advancing` before any item is removed, so a cut
    /// interrupted by a provider failure is retried by the next call.
    async fn cut_to(
        &self,
        sequence: &Sequence,
        session: &mut PlaybackSession,
        target: usize,
    ) -> Result<BlendDefinition> {
        let stage = sequence.stage(target).ok_or_else(|| {
            WeaveError::invalid_input(format!(
                "stage {target} out of range for a {}-stage sequence",
                sequence.len()
            ))
        })?;
        let definition = self.definition(&stage.blend_id, &session.owner_id).await?;
        let from = session.stage_index();

        let store = self.sessions();
        if let Some(link) = session.sequence.as_mut() {
            link.transition = StageTransition::Advancing { target };
        }
        store.save(session).await?;

        let purged = store.purge_items(&session.id).await?;
        materialize(
            self.provider.as_ref(),
            self.storage.as_ref(),
            &definition,
            &session.id,
        )
        .await?;

        let now = self.now();
        session.blend_id = stage.blend_id.clone();
        session.start_time = now;
        session.current_pool_id = None;
        session.weight_snapshot = None;
        session.sequence = Some(SequenceLink {
            sequence_id: sequence.id.clone(),
            stage_index: target,
            stage_time_limit_minutes: sequence.limit_for(target),
            transition: StageTransition::Playing,
        });
        store.touch(session, now).await?;

        info!(
            session = %session.id,
            from = ?from,
            to = target,
            blend = %stage.blend_id,
            purged,
            "Advanced sequence stage"
        );
        Ok(definition)
    }
}

fn sequence_link(session: &PlaybackSession) -> Result<&SequenceLink> {
    session.sequence.as_ref().ok_or_else(|| {
        WeaveError::invalid_input(format!("session {} is not playing a sequence", session.id))
    })
}
