use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use voxgate_features::{Extractor, FeatureCache, FeatureSequence};

use crate::engine::{EnrollOutcome, FileSource, Identification, Identifier, Verifier};
use crate::pipeline::{AuthenticationResult, Pipeline};
use crate::store::ModelStore;
use crate::{AuthConfig, AuthError, DtwEngine, GmmEngine, Score};

/// Which engines an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engines {
    Gmm,
    Dtw,
    Both,
}

impl Engines {
    pub fn gmm(self) -> bool {
        matches!(self, Engines::Gmm | Engines::Both)
    }

    pub fn dtw(self) -> bool {
        matches!(self, Engines::Dtw | Engines::Both)
    }
}

/// What is enrolled for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentitySummary {
    pub name: String,
    pub gmm: bool,
    pub templates: usize,
    pub background: bool,
}

/// File-level voice authentication service.
///
/// Owns the extractor, the feature cache and both engines, and mirrors every
/// enrollment and removal into an optional [`ModelStore`].
pub struct VoiceAuth {
    cfg: AuthConfig,
    extractor: Extractor,
    cache: FeatureCache,
    gmm: GmmEngine,
    dtw: DtwEngine,
    store: Option<ModelStore>,
}

impl VoiceAuth {
    /// Creates a service with empty in-memory engines.
    pub fn new(cfg: AuthConfig) -> Result<Self, AuthError> {
        let extractor = Extractor::new(cfg.features.clone())?;
        let gmm = GmmEngine::new(
            cfg.gmm.clone(),
            cfg.background.clone(),
            cfg.decision.margin_threshold,
        );
        let dtw = DtwEngine::new(cfg.dtw.band);
        Ok(Self {
            cfg,
            extractor,
            cache: FeatureCache::new(),
            gmm,
            dtw,
            store: None,
        })
    }

    /// Creates a service backed by `store`, restoring everything enrolled
    /// in it.
    pub fn with_store(cfg: AuthConfig, store: ModelStore) -> Result<Self, AuthError> {
        let mut svc = Self::new(cfg)?;
        store.restore(&svc.gmm, &svc.dtw)?;
        svc.store = Some(store);
        Ok(svc)
    }

    pub fn config(&self) -> &AuthConfig {
        &self.cfg
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }

    pub fn gmm(&self) -> &GmmEngine {
        &self.gmm
    }

    pub fn dtw(&self) -> &DtwEngine {
        &self.dtw
    }

    pub fn source(&self) -> FileSource<'_> {
        FileSource {
            extractor: &self.extractor,
            cache: &self.cache,
            workers: self.cfg.workers,
        }
    }

    /// The decision pipeline over this service's engines.
    pub fn pipeline(&self) -> Pipeline<'_, GmmEngine, DtwEngine> {
        Pipeline::new(&self.gmm, &self.dtw, self.cfg.decision.distance_threshold)
    }

    /// Extracts one file through the cache.
    pub fn extract_file(&self, path: &Path) -> Result<Arc<FeatureSequence>, AuthError> {
        Ok(self.cache.get_or_extract(&self.extractor, path)?)
    }

    /// Enrolls `identity` from audio files into the selected engines.
    ///
    /// Files go through the feature cache, so a file used by both engines
    /// is decoded once. The background identity is only ever enrolled into
    /// the GMM engine.
    pub fn enroll_files(
        &self,
        identity: &str,
        paths: &[PathBuf],
        engines: Engines,
    ) -> Result<Vec<EnrollOutcome>, AuthError> {
        let source = self.source();
        let mut outcomes = Vec::new();
        if engines.gmm() {
            let outcome = self.gmm.enroll_files(&source, identity, paths)?;
            if let (true, Some(store), Some(model)) =
                (outcome.is_enrolled(), &self.store, self.gmm.model(identity))
            {
                store.save_gmm(identity, &model)?;
            }
            outcomes.push(outcome);
        }
        if engines.dtw() && identity != self.cfg.background {
            let outcome = self.dtw.enroll_files(&source, identity, paths)?;
            if let (true, Some(store), Some(gallery)) =
                (outcome.is_enrolled(), &self.store, self.dtw.gallery(identity))
            {
                store.save_dtw(identity, &gallery)?;
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    pub fn identify_file(&self, path: &Path) -> Result<Identification, AuthError> {
        let seq = self.extract_file(path)?;
        self.gmm.identify(&seq)
    }

    /// Scores a claimed identity with one engine: the background margin for
    /// GMM, the alignment distance for DTW. [`Engines::Both`] is a
    /// configuration error.
    pub fn verify_file(
        &self,
        identity: &str,
        path: &Path,
        engine: Engines,
    ) -> Result<Score, AuthError> {
        if engine == Engines::Both {
            return Err(AuthError::Config(
                "verification scores one engine at a time".into(),
            ));
        }
        let seq = self.extract_file(path)?;
        match engine {
            Engines::Gmm => self.gmm.verify(identity, &seq),
            Engines::Dtw | Engines::Both => self.dtw.verify(identity, &seq),
        }
    }

    /// Full two-stage authentication of one recording. Never fails;
    /// extraction errors become a rejection.
    pub fn authenticate_file(&self, path: &Path) -> AuthenticationResult {
        match self.extract_file(path) {
            Ok(seq) => self.authenticate(&seq),
            Err(e) => {
                info!(path = %path.display(), error = %e, "rejected: feature extraction failed");
                AuthenticationResult::failed(&e)
            }
        }
    }

    pub fn authenticate(&self, seq: &FeatureSequence) -> AuthenticationResult {
        self.pipeline().authenticate(seq)
    }

    /// Removes `identity` from both engines and the store. Returns true if
    /// it was enrolled anywhere.
    pub fn remove(&self, identity: &str) -> Result<bool, AuthError> {
        let in_gmm = self.gmm.remove(identity);
        let in_dtw = self.dtw.remove(identity);
        let in_store = match &self.store {
            Some(store) => store.remove(identity)?,
            None => false,
        };
        if in_gmm || in_dtw || in_store {
            info!(identity, "identity removed");
        }
        Ok(in_gmm || in_dtw || in_store)
    }

    /// Every enrolled identity, GMM enrollment order first.
    pub fn identities(&self) -> Vec<IdentitySummary> {
        let mut names = self.gmm.identities();
        for name in self.dtw.identities() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
            .into_iter()
            .map(|name| IdentitySummary {
                gmm: self.gmm.contains(&name),
                templates: self.dtw.gallery(&name).map_or(0, |g| g.len()),
                background: name == self.cfg.background,
                name,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_selection() {
        assert!(Engines::Both.gmm() && Engines::Both.dtw());
        assert!(Engines::Gmm.gmm() && !Engines::Gmm.dtw());
        assert!(!Engines::Dtw.gmm() && Engines::Dtw.dtw());
    }

    #[test]
    fn test_invalid_feature_config_is_rejected() {
        let mut cfg = AuthConfig::default();
        cfg.features.frame_shift = 0;
        assert!(matches!(VoiceAuth::new(cfg), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_verify_with_both_engines_is_rejected() {
        let auth = VoiceAuth::new(AuthConfig::default()).unwrap();
        let err = auth
            .verify_file("alice", Path::new("/missing.wav"), Engines::Both)
            .unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
    }

    #[test]
    fn test_remove_unknown_identity() {
        let svc = VoiceAuth::with_store(AuthConfig::default(), ModelStore::in_memory()).unwrap();
        assert!(!svc.remove("nobody").unwrap());
        assert!(svc.identities().is_empty());
    }

    #[test]
    fn test_identities_merge_both_engines() {
        let svc = VoiceAuth::new(AuthConfig::default()).unwrap();
        let seq = Arc::new(FeatureSequence::new(2, vec![0.0, 1.0, 1.0, 0.0]).unwrap());
        svc.dtw().enroll("alice", &[seq.clone(), seq]).unwrap();

        let ids = svc.identities();
        assert_eq!(
            ids,
            vec![IdentitySummary {
                name: "alice".into(),
                gmm: false,
                templates: 2,
                background: false,
            }]
        );
    }
}
