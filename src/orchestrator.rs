//! Validation loop around the planner
//!
//! A plan is generated once, then every stop is resolved against the geodata
//! provider and scored. Failing stops are sent back to the planner for
//! replacement until a round passes or the retry budget is spent.

use chrono::NaiveDate;
use futures::{StreamExt, stream};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::accessibility::{self, AccessibilityAssessment, EntranceStatus};
use crate::config::{BarrierFreeConfig, ValidationConfig};
use crate::generation::{GenerationMode, PlanGenerator};
use crate::models::{ItineraryPlan, LocationHint, Place, ReplacementRequest, UserTravelProfile};
use crate::resolver::{PlaceResolver, Resolution};
use crate::{BarrierFreeError, Result};

/// How a build ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// No accessibility need declared, the first draft is returned untouched
    Skipped,
    /// Every stop passed validation
    Validated,
    /// Retries ran out with failing stops left
    Exhausted,
    /// A refine call failed and the last plan was kept
    RefineFailed,
}

/// A stop that did not pass the final validation round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedPlace {
    pub date: NaiveDate,
    pub name: String,
    pub reason: String,
    /// Scored provider flags, absent when the place was not found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<AccessibilityAssessment>,
}

impl From<UnresolvedPlace> for ReplacementRequest {
    fn from(place: UnresolvedPlace) -> Self {
        ReplacementRequest {
            date: place.date,
            original_place: place.name,
            reason: place.reason,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItineraryOutcome {
    pub plan: ItineraryPlan,
    pub status: OutcomeStatus,
    pub unresolved: Vec<UnresolvedPlace>,
    /// Validation rounds performed, 0 when skipped
    pub rounds: u32,
}

impl ItineraryOutcome {
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.unresolved.is_empty()
    }
}

/// Loop states; `Done` and `DoneWithWarnings` are terminal
#[derive(Debug)]
enum ValidationState {
    Validating,
    Regenerating(Vec<UnresolvedPlace>),
    Done,
    DoneWithWarnings(OutcomeStatus, Vec<UnresolvedPlace>),
}

/// Why a stop fails, or `None` when it passes
#[must_use]
pub fn place_failure(
    place: &Place,
    resolution: &Resolution,
    policy: &ValidationConfig,
) -> Option<String> {
    let mut reasons = Vec::new();

    match resolution {
        Resolution::NotFound => reasons.push("not found in geodata provider".to_string()),
        Resolution::Found(record) => {
            match EntranceStatus::from_flag(record.accessibility.entrance) {
                EntranceStatus::Accessible => {}
                EntranceStatus::Inaccessible => {
                    reasons.push(EntranceStatus::Inaccessible.reason().to_string());
                }
                EntranceStatus::Unknown if policy.require_confirmed_entrance => {
                    reasons.push(EntranceStatus::Unknown.reason().to_string());
                }
                EntranceStatus::Unknown => {
                    debug!("'{}' has no entrance data, accepted", place.name);
                }
            }
        }
    }

    if place.accessibility_score < policy.min_place_score {
        reasons.push(format!(
            "self-reported accessibility score {} is below {}",
            place.accessibility_score, policy.min_place_score
        ));
    }

    if reasons.is_empty() {
        None
    } else {
        Some(reasons.join("; "))
    }
}

fn hint_for(place: &Place, profile: &UserTravelProfile) -> LocationHint {
    let mut hint = LocationHint::for_place(place);
    if hint.city.trim().is_empty() {
        hint.city.clone_from(&profile.city);
    }
    if hint.country.trim().is_empty() {
        hint.country.clone_from(&profile.country);
    }
    hint
}

/// Coordinates generation, resolution and scoring for one request
pub struct ValidationOrchestrator {
    generator: Arc<dyn PlanGenerator>,
    resolver: Arc<PlaceResolver>,
    policy: ValidationConfig,
    max_concurrency: usize,
    generation_timeout: Duration,
    request_timeout: Duration,
}

impl ValidationOrchestrator {
    pub fn new(
        generator: Arc<dyn PlanGenerator>,
        resolver: Arc<PlaceResolver>,
        policy: ValidationConfig,
    ) -> Self {
        let defaults = BarrierFreeConfig::default();
        Self {
            generator,
            resolver,
            policy,
            max_concurrency: defaults.geodata.max_concurrency,
            generation_timeout: defaults.generation.timeout(),
            request_timeout: defaults.server.request_timeout(),
        }
    }

    pub fn from_config(
        generator: Arc<dyn PlanGenerator>,
        resolver: Arc<PlaceResolver>,
        config: &BarrierFreeConfig,
    ) -> Self {
        Self::new(generator, resolver, config.validation.clone())
            .with_max_concurrency(config.geodata.max_concurrency)
            .with_generation_timeout(config.generation.timeout())
            .with_request_timeout(config.server.request_timeout())
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_generation_timeout(mut self, generation_timeout: Duration) -> Self {
        self.generation_timeout = generation_timeout;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Build a validated itinerary for `profile`.
    ///
    /// Runs under the request timeout. On expiry the in-progress plan is
    /// dropped and a `Timeout` error is returned.
    #[instrument(skip_all, fields(city = %profile.city, country = %profile.country))]
    pub async fn build(&self, profile: &UserTravelProfile) -> Result<ItineraryOutcome> {
        timeout(self.request_timeout, self.run(profile))
            .await
            .map_err(|_| {
                warn!("Itinerary build exceeded {:?}", self.request_timeout);
                BarrierFreeError::timeout(format!(
                    "itinerary build did not finish within {}s",
                    self.request_timeout.as_secs()
                ))
            })?
    }

    async fn generate(
        &self,
        profile: &UserTravelProfile,
        mode: GenerationMode<'_>,
    ) -> Result<ItineraryPlan> {
        timeout(self.generation_timeout, self.generator.generate(profile, mode))
            .await
            .map_err(|_| {
                BarrierFreeError::timeout(format!(
                    "generation did not finish within {}s",
                    self.generation_timeout.as_secs()
                ))
            })?
    }

    async fn run(&self, profile: &UserTravelProfile) -> Result<ItineraryOutcome> {
        let mut plan = self.generate(profile, GenerationMode::Initial).await?;

        if !profile.requires_accessibility() {
            info!("No accessibility needs declared, skipping validation");
            return Ok(ItineraryOutcome {
                plan,
                status: OutcomeStatus::Skipped,
                unresolved: Vec::new(),
                rounds: 0,
            });
        }

        let mut round = 0;
        let mut rounds_done = 0;
        let mut state = ValidationState::Validating;

        loop {
            state = match state {
                ValidationState::Validating => {
                    let failures = self.validate_round(profile, &plan).await;
                    rounds_done += 1;
                    info!(
                        "Validation round {} finished: {} of {} places failing",
                        round,
                        failures.len(),
                        plan.place_count()
                    );

                    if failures.is_empty() {
                        ValidationState::Done
                    } else if round >= self.policy.max_retries {
                        ValidationState::DoneWithWarnings(OutcomeStatus::Exhausted, failures)
                    } else {
                        ValidationState::Regenerating(failures)
                    }
                }
                ValidationState::Regenerating(failures) => {
                    let replacements: Vec<ReplacementRequest> =
                        failures.iter().cloned().map(ReplacementRequest::from).collect();
                    let refined = self
                        .generate(
                            profile,
                            GenerationMode::Refine {
                                replacements: &replacements,
                                current: &plan,
                            },
                        )
                        .await;

                    match refined {
                        Ok(next) => {
                            plan = next;
                            round += 1;
                            ValidationState::Validating
                        }
                        Err(e) if self.policy.fallback_on_refine_error => {
                            warn!("Refine round failed, keeping the last plan: {}", e);
                            ValidationState::DoneWithWarnings(OutcomeStatus::RefineFailed, failures)
                        }
                        Err(e) => return Err(e),
                    }
                }
                ValidationState::Done => {
                    return Ok(ItineraryOutcome {
                        plan,
                        status: OutcomeStatus::Validated,
                        unresolved: Vec::new(),
                        rounds: rounds_done,
                    });
                }
                ValidationState::DoneWithWarnings(status, unresolved) => {
                    warn!(
                        "Returning plan with {} unresolved places ({:?})",
                        unresolved.len(),
                        status
                    );
                    return Ok(ItineraryOutcome {
                        plan,
                        status,
                        unresolved,
                        rounds: rounds_done,
                    });
                }
            };
        }
    }

    /// Resolve and score every stop; results keep plan order
    async fn validate_round(
        &self,
        profile: &UserTravelProfile,
        plan: &ItineraryPlan,
    ) -> Vec<UnresolvedPlace> {
        let stops: Vec<(NaiveDate, Place)> = plan
            .places()
            .map(|(date, place)| (date, place.clone()))
            .collect();

        let checks = stops.into_iter().map(|(date, place)| async move {
            let hint = hint_for(&place, profile);
            let resolution = self.resolver.resolve(&place.name, &hint).await;
            let assessment = resolution
                .record()
                .map(|record| accessibility::score(&record.accessibility));
            let failure = place_failure(&place, &resolution, &self.policy);
            match (&failure, &assessment) {
                (Some(reason), Some(a)) => debug!(
                    "FAIL '{}': {} (points {}, issues {:?})",
                    place.name, reason, a.score, a.issues
                ),
                (Some(reason), None) => debug!("FAIL '{}': {}", place.name, reason),
                (None, _) => debug!("PASS '{}'", place.name),
            }
            failure.map(|reason| UnresolvedPlace {
                date,
                name: place.name,
                reason,
                assessment,
            })
        });

        stream::iter(checks)
            .buffered(self.max_concurrency)
            .filter_map(|failure| async move { failure })
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use crate::geodata::{GeodataProvider, SearchBias};
    use crate::models::itinerary::fixtures::{place, plan};
    use crate::models::{AccessibilityFlags, PlaceRecord};
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(entrance: Option<bool>) -> PlaceRecord {
        PlaceRecord {
            id: "id".to_string(),
            display_name: "Somewhere".to_string(),
            formatted_address: "Busan".to_string(),
            latitude: 35.1,
            longitude: 129.0,
            accessibility: AccessibilityFlags {
                entrance,
                ..AccessibilityFlags::default()
            },
        }
    }

    /// Every query resolves to a place with the given entrance flag
    struct FixedProvider {
        entrance: Option<bool>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GeodataProvider for FixedProvider {
        async fn text_search(
            &self,
            _query: &str,
            _bias: Option<SearchBias>,
        ) -> Result<Option<PlaceRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(record(self.entrance)))
        }
    }

    /// Hands out plans from a script, repeating the last one
    struct ScriptedGenerator {
        plans: Mutex<Vec<ItineraryPlan>>,
        calls: AtomicUsize,
        refine_requests: Mutex<Vec<Vec<ReplacementRequest>>>,
        fail_refine: bool,
    }

    impl ScriptedGenerator {
        fn new(plans: Vec<ItineraryPlan>) -> Self {
            Self {
                plans: Mutex::new(plans),
                calls: AtomicUsize::new(0),
                refine_requests: Mutex::new(Vec::new()),
                fail_refine: false,
            }
        }
    }

    #[async_trait]
    impl PlanGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _profile: &UserTravelProfile,
            mode: GenerationMode<'_>,
        ) -> Result<ItineraryPlan> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let GenerationMode::Refine { replacements, .. } = mode {
                self.refine_requests.lock().unwrap().push(replacements.to_vec());
                if self.fail_refine {
                    return Err(BarrierFreeError::generation("no tool call"));
                }
            }
            let mut plans = self.plans.lock().unwrap();
            if plans.len() > 1 {
                Ok(plans.remove(0))
            } else {
                Ok(plans[0].clone())
            }
        }
    }

    fn profile(wheelchair: bool) -> UserTravelProfile {
        UserTravelProfile {
            country: "South Korea".to_string(),
            city: "Busan".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            travel_style: "culture".to_string(),
            disability_types: BTreeSet::new(),
            is_wheelchair_user: wheelchair,
        }
    }

    fn orchestrator(
        generator: Arc<ScriptedGenerator>,
        provider: Arc<FixedProvider>,
        policy: ValidationConfig,
    ) -> ValidationOrchestrator {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(1800)));
        let resolver = Arc::new(PlaceResolver::new(provider, cache));
        ValidationOrchestrator::new(generator, resolver, policy)
    }

    fn provider(entrance: Option<bool>) -> Arc<FixedProvider> {
        Arc::new(FixedProvider {
            entrance,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_place_failure_rules() {
        let policy = ValidationConfig::default();
        let good = place("A", 5);

        assert!(place_failure(&good, &Resolution::Found(record(Some(true))), &policy).is_none());
        assert!(place_failure(&good, &Resolution::Found(record(None)), &policy).is_none());
        assert_eq!(
            place_failure(&good, &Resolution::Found(record(Some(false))), &policy).as_deref(),
            Some("explicitly inaccessible entrance")
        );
        assert_eq!(
            place_failure(&good, &Resolution::NotFound, &policy).as_deref(),
            Some("not found in geodata provider")
        );
        assert_eq!(
            place_failure(&place("B", 3), &Resolution::Found(record(Some(true))), &policy)
                .as_deref(),
            Some("self-reported accessibility score 3 is below 4")
        );
    }

    #[test]
    fn test_strict_entrance_rejects_unknown() {
        let policy = ValidationConfig {
            require_confirmed_entrance: true,
            ..ValidationConfig::default()
        };
        assert_eq!(
            place_failure(&place("A", 5), &Resolution::Found(record(None)), &policy).as_deref(),
            Some("no accessibility data recorded")
        );
    }

    #[tokio::test]
    async fn test_low_score_is_replaced_then_done() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            plan(vec![place("Old Fort, Busan", 2)]),
            plan(vec![place("Busan Museum, Busan", 5)]),
        ]));
        let orchestrator = orchestrator(
            generator.clone(),
            provider(Some(true)),
            ValidationConfig::default(),
        );

        let outcome = orchestrator.build(&profile(true)).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Validated);
        assert_eq!(outcome.rounds, 2);
        assert!(outcome.unresolved.is_empty());
        assert_eq!(outcome.plan.itinerary[0].places[0].name, "Busan Museum, Busan");

        let requests = generator.refine_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), 1);
        assert_eq!(requests[0][0].original_place, "Old Fort, Busan");
    }

    #[tokio::test]
    async fn test_always_failing_plan_stops_after_three_rounds() {
        let generator = Arc::new(ScriptedGenerator::new(vec![plan(vec![place("Old Fort", 2)])]));
        let orchestrator = orchestrator(
            generator.clone(),
            provider(Some(true)),
            ValidationConfig::default(),
        );

        let outcome = orchestrator.build(&profile(true)).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Exhausted);
        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.unresolved.len(), 1);
        // one initial draft plus two refinements
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
        assert!(outcome.plan.check_shape(&profile(true)).is_ok());
    }

    #[tokio::test]
    async fn test_no_needs_skips_resolution() {
        let generator = Arc::new(ScriptedGenerator::new(vec![plan(vec![place("Old Fort", 2)])]));
        let provider = provider(Some(true));
        let orchestrator =
            orchestrator(generator.clone(), provider.clone(), ValidationConfig::default());

        let outcome = orchestrator.build(&profile(false)).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.plan, plan(vec![place("Old Fort", 2)]));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refine_error_is_fatal_by_default() {
        let mut generator = ScriptedGenerator::new(vec![plan(vec![place("Old Fort", 2)])]);
        generator.fail_refine = true;
        let orchestrator = orchestrator(
            Arc::new(generator),
            provider(Some(true)),
            ValidationConfig::default(),
        );

        let err = orchestrator.build(&profile(true)).await.unwrap_err();
        assert!(matches!(err, BarrierFreeError::Generation { .. }));
    }

    #[tokio::test]
    async fn test_refine_error_falls_back_when_configured() {
        let mut generator = ScriptedGenerator::new(vec![plan(vec![place("Old Fort", 2)])]);
        generator.fail_refine = true;
        let policy = ValidationConfig {
            fallback_on_refine_error: true,
            ..ValidationConfig::default()
        };
        let orchestrator = orchestrator(Arc::new(generator), provider(Some(true)), policy);

        let outcome = orchestrator.build(&profile(true)).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::RefineFailed);
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.unresolved[0].name, "Old Fort");
    }

    #[tokio::test]
    async fn test_inaccessible_entrance_is_reported() {
        let generator = Arc::new(ScriptedGenerator::new(vec![plan(vec![
            place("A", 5),
            place("B", 5),
        ])]));
        let policy = ValidationConfig {
            max_retries: 0,
            ..ValidationConfig::default()
        };
        let orchestrator = orchestrator(generator, provider(Some(false)), policy);

        let outcome = orchestrator.build(&profile(true)).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Exhausted);
        assert_eq!(outcome.rounds, 1);
        let names: Vec<_> = outcome.unresolved.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(outcome.has_warnings());

        let assessment = outcome.unresolved[0].assessment.as_ref().unwrap();
        assert_eq!(assessment.score, 0);
        assert!(assessment.issues.contains(accessibility::ISSUE_NO_ENTRANCE));
    }

    /// Resolves every query after a short delay and tracks overlapping calls
    struct PeakProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl GeodataProvider for PeakProvider {
        async fn text_search(
            &self,
            _query: &str,
            _bias: Option<SearchBias>,
        ) -> Result<Option<PlaceRecord>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(record(Some(true))))
        }
    }

    #[tokio::test]
    async fn test_round_resolution_is_bounded_by_max_concurrency() {
        let places = (0..10).map(|i| place(&format!("Stop {i}"), 5)).collect();
        let generator = Arc::new(ScriptedGenerator::new(vec![plan(places)]));
        let provider = Arc::new(PeakProvider {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let cache = Arc::new(TtlCache::new(Duration::from_secs(1800)));
        let resolver = Arc::new(PlaceResolver::new(provider.clone(), cache));
        let orchestrator =
            ValidationOrchestrator::new(generator, resolver, ValidationConfig::default())
                .with_max_concurrency(3);

        let outcome = orchestrator.build(&profile(true)).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Validated);
        assert_eq!(provider.peak.load(Ordering::SeqCst), 3);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_build_future_is_send() {
        let orchestrator = orchestrator(
            Arc::new(ScriptedGenerator::new(vec![plan(vec![place("A", 5)])])),
            provider(Some(true)),
            ValidationConfig::default(),
        );
        let profile = profile(true);
        assert_send(&orchestrator.build(&profile));
    }
}
