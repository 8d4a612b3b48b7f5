use rand::Rng;

use quiz_core::model::{DomainId, EngineSettings, ExamSize, Question, SessionConfig, TestMode};

use super::shuffle::{shuffle_options, shuffled};

/// How many questions one domain contributed to a stratified selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainDraw {
    pub domain: DomainId,
    pub quota: usize,
    pub available: usize,
    pub drawn: usize,
}

impl DomainDraw {
    /// True when the domain pool could not fill its quota.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.drawn < self.quota
    }
}

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPlan {
    pub questions: Vec<Question>,
    /// Per-domain accounting; empty for non-exam modes.
    pub draws: Vec<DomainDraw>,
}

impl SelectionPlan {
    /// Total number of questions in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Picks and shuffles the question list for a session.
///
/// - Topic-comprehensive: every question of the topic in corpus order.
/// - Topic-quick / domain-quick: up to `quick_size` random questions.
/// - Domain-comprehensive: every question of the domain, shuffled.
/// - Exams: per-domain quotas from the blueprint, each drawn without
///   replacement and capped at what the domain has, then the combined list
///   is reshuffled so domains are interleaved.
///
/// Options of every selected question are shuffled as well.
pub struct Sampler<'a> {
    settings: &'a EngineSettings,
}

impl<'a> Sampler<'a> {
    #[must_use]
    pub fn new(settings: &'a EngineSettings) -> Self {
        Self { settings }
    }

    pub fn sample<R: Rng + ?Sized>(
        &self,
        corpus: &[Question],
        config: &SessionConfig,
        rng: &mut R,
    ) -> SelectionPlan {
        let mode = config.mode();
        let (picked, draws) = match mode.exam_size() {
            Some(size) => self.stratified(corpus, size, rng),
            None => (self.pooled(corpus, mode, rng), Vec::new()),
        };

        let questions = picked.iter().map(|q| shuffle_options(q, rng)).collect();
        SelectionPlan { questions, draws }
    }

    fn pooled<R: Rng + ?Sized>(
        &self,
        corpus: &[Question],
        mode: &TestMode,
        rng: &mut R,
    ) -> Vec<Question> {
        let quick = self.settings.quick_size();
        match mode {
            TestMode::TopicComprehensive(topic) => corpus
                .iter()
                .filter(|q| q.topic_id() == topic)
                .cloned()
                .collect(),
            TestMode::TopicQuick(topic) => {
                let pool: Vec<Question> = corpus
                    .iter()
                    .filter(|q| q.topic_id() == topic)
                    .cloned()
                    .collect();
                draw(&pool, quick, rng)
            }
            TestMode::DomainQuick(domain) => draw(&domain_pool(corpus, domain), quick, rng),
            TestMode::DomainComprehensive(domain) => shuffled(&domain_pool(corpus, domain), rng),
            // stratified
            TestMode::FullExam | TestMode::QuickExam | TestMode::SuperQuickExam => Vec::new(),
        }
    }

    fn stratified<R: Rng + ?Sized>(
        &self,
        corpus: &[Question],
        size: ExamSize,
        rng: &mut R,
    ) -> (Vec<Question>, Vec<DomainDraw>) {
        let total = self.settings.exam_size(size);
        let mut combined = Vec::with_capacity(total);
        let mut draws = Vec::new();

        for (domain, quota) in self.settings.blueprint().quotas(total) {
            let pool = domain_pool(corpus, &domain);
            let picked = draw(&pool, quota, rng);
            let record = DomainDraw {
                domain,
                quota,
                available: pool.len(),
                drawn: picked.len(),
            };
            if record.is_short() {
                tracing::warn!(
                    domain = %record.domain,
                    quota = record.quota,
                    available = record.available,
                    "domain pool short of exam quota"
                );
            }
            draws.push(record);
            combined.extend(picked);
        }

        (shuffled(&combined, rng), draws)
    }
}

fn domain_pool(corpus: &[Question], domain: &DomainId) -> Vec<Question> {
    corpus
        .iter()
        .filter(|q| domain.contains(q.topic_id()))
        .cloned()
        .collect()
}

/// Up to `count` distinct items from `pool`, in random order.
fn draw<R: Rng + ?Sized>(pool: &[Question], count: usize, rng: &mut R) -> Vec<Question> {
    let mut picked = shuffled(pool, rng);
    picked.truncate(count);
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionId, TopicId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn build_question(id: u64, topic: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            TopicId::new(topic).unwrap(),
            format!("Q{id}"),
            vec![format!("right {id}"), "wrong a".into(), "wrong b".into()],
            0,
        )
        .unwrap()
    }

    /// `per_domain[i]` questions in domain `i + 1`, spread over two topics.
    fn corpus(per_domain: [u64; 3]) -> Vec<Question> {
        let mut out = Vec::new();
        let mut id = 0;
        for (d, count) in per_domain.iter().enumerate() {
            for n in 0..*count {
                id += 1;
                out.push(build_question(id, &format!("{}.{}", d + 1, n % 2 + 1)));
            }
        }
        out
    }

    fn config(mode: &str, target: Option<&str>) -> SessionConfig {
        SessionConfig::parse(mode, target).unwrap()
    }

    fn domain_counts(plan: &SelectionPlan) -> [usize; 3] {
        let mut counts = [0; 3];
        for q in &plan.questions {
            let d: usize = q.domain_id().as_str().parse().unwrap();
            counts[d - 1] += 1;
        }
        counts
    }

    fn assert_distinct(plan: &SelectionPlan) {
        let ids: HashSet<_> = plan.questions.iter().map(Question::id).collect();
        assert_eq!(ids.len(), plan.total());
    }

    #[test]
    fn full_exam_hits_exact_quotas() {
        let settings = EngineSettings::default();
        let corpus = corpus([100, 100, 100]);
        let mut rng = StdRng::seed_from_u64(1);

        let plan = Sampler::new(&settings).sample(&corpus, &config("full-exam", None), &mut rng);

        assert_eq!(plan.total(), 80);
        assert_eq!(domain_counts(&plan), [32, 32, 16]);
        assert_eq!(plan.draws.len(), 3);
        assert!(plan.draws.iter().all(|d| !d.is_short()));
        assert_distinct(&plan);
    }

    #[test]
    fn shorter_exams_scale_quotas() {
        let settings = EngineSettings::default();
        let corpus = corpus([50, 50, 50]);
        let mut rng = StdRng::seed_from_u64(2);
        let sampler = Sampler::new(&settings);

        let quick = sampler.sample(&corpus, &config("quick-exam", None), &mut rng);
        assert_eq!(domain_counts(&quick), [8, 8, 4]);

        let super_quick = sampler.sample(&corpus, &config("super-quick-exam", None), &mut rng);
        assert_eq!(domain_counts(&super_quick), [4, 4, 2]);
    }

    #[test]
    fn short_domain_pool_shrinks_total() {
        let settings = EngineSettings::default();
        let corpus = corpus([100, 5, 100]);
        let mut rng = StdRng::seed_from_u64(3);

        let plan = Sampler::new(&settings).sample(&corpus, &config("full-exam", None), &mut rng);

        assert_eq!(domain_counts(&plan), [32, 5, 16]);
        assert_eq!(plan.total(), 53);
        let short: Vec<_> = plan.draws.iter().filter(|d| d.is_short()).collect();
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].domain.as_str(), "2");
        assert_eq!(short[0].available, 5);
    }

    #[test]
    fn stratified_counts_hold_across_seeds() {
        let settings = EngineSettings::default();
        let corpus = corpus([40, 12, 30]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan =
                Sampler::new(&settings).sample(&corpus, &config("full-exam", None), &mut rng);
            assert_eq!(domain_counts(&plan), [32, 12, 16]);
            assert_distinct(&plan);
        }
    }

    #[test]
    fn exam_order_interleaves_domains() {
        let settings = EngineSettings::default();
        let corpus = corpus([100, 100, 100]);
        let mut rng = StdRng::seed_from_u64(9);

        let plan = Sampler::new(&settings).sample(&corpus, &config("full-exam", None), &mut rng);

        let leading: HashSet<String> = plan.questions[..32]
            .iter()
            .map(|q| q.domain_id().to_string())
            .collect();
        assert!(leading.len() > 1, "first block should not be a single domain");
    }

    #[test]
    fn topic_quick_returns_whole_small_pool() {
        let settings = EngineSettings::default();
        let corpus = vec![
            build_question(1, "1.1"),
            build_question(2, "1.1"),
            build_question(3, "1.1"),
            build_question(4, "1.2"),
        ];
        let mut rng = StdRng::seed_from_u64(4);

        let plan =
            Sampler::new(&settings).sample(&corpus, &config("topic-quick", Some("1.1")), &mut rng);

        assert_eq!(plan.total(), 3);
        assert_distinct(&plan);
        assert!(plan.questions.iter().all(|q| q.topic_id().as_str() == "1.1"));
    }

    #[test]
    fn quick_modes_cap_at_quick_size() {
        let settings = EngineSettings::default();
        let corpus = corpus([30, 0, 0]);
        let mut rng = StdRng::seed_from_u64(5);
        let sampler = Sampler::new(&settings);

        let topic = sampler.sample(&corpus, &config("topic-quick", Some("1.1")), &mut rng);
        assert_eq!(topic.total(), 10);

        let domain = sampler.sample(&corpus, &config("domain-quick", Some("1")), &mut rng);
        assert_eq!(domain.total(), 10);
        assert_distinct(&domain);
    }

    #[test]
    fn domain_comprehensive_takes_everything() {
        let settings = EngineSettings::default();
        let corpus = corpus([7, 4, 0]);
        let mut rng = StdRng::seed_from_u64(6);

        let plan = Sampler::new(&settings).sample(&corpus, &config("domain", Some("2")), &mut rng);

        assert_eq!(plan.total(), 4);
        assert!(plan.questions.iter().all(|q| q.domain_id().as_str() == "2"));
        assert!(plan.draws.is_empty());
    }

    #[test]
    fn topic_comprehensive_keeps_corpus_order() {
        let settings = EngineSettings::default();
        let corpus = corpus([12, 0, 0]);
        let mut rng = StdRng::seed_from_u64(8);

        let plan = Sampler::new(&settings).sample(&corpus, &config("topic", Some("1.2")), &mut rng);

        let ids: Vec<u64> = plan.questions.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![2, 4, 6, 8, 10, 12]);
    }

    #[test]
    fn selected_options_are_shuffled_consistently() {
        let settings = EngineSettings::default();
        let corpus = corpus([20, 20, 20]);
        let mut rng = StdRng::seed_from_u64(10);

        let plan = Sampler::new(&settings).sample(&corpus, &config("full-exam", None), &mut rng);

        for question in &plan.questions {
            assert_eq!(
                question.correct_option(),
                format!("right {}", question.id())
            );
        }
        assert!(plan.questions.iter().any(|q| q.correct_answer() != 0));
    }

    #[test]
    fn missing_target_yields_empty_plan() {
        let settings = EngineSettings::default();
        let corpus = corpus([5, 5, 5]);
        let mut rng = StdRng::seed_from_u64(11);

        let plan = Sampler::new(&settings).sample(&corpus, &config("topic", Some("9.9")), &mut rng);
        assert!(plan.is_empty());
    }
}
