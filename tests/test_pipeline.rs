mod mock_plugins;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use reasoning_pipeline::domain::executor::{Executor, PipelineHandle};
use reasoning_pipeline::domain::pipeline::grid::{FileTransfer, JobSpec, JobState, ResourceBroker};
use reasoning_pipeline::domain::plugin::PluginRegistry;
use reasoning_pipeline::domain::triple::{Triple, TripleSet};
use reasoning_pipeline::domain::utils::id::{JobId, PathId};
use reasoning_pipeline::domain::vocabulary as voc;
use reasoning_pipeline::error::{Error, Result};

use mock_plugins::{payload_of, EchoPlugin, FailingPlugin, SourcePlugin, TagPlugin, ECHO_TYPE, FAILING_TYPE, TAG_TYPE};

const PATH: &str = "urn:path:main";

fn t(subject: &str, predicate: &str, object: &str) -> Triple {
    Triple::new(subject, predicate, object)
}

fn description(triples: Vec<Triple>) -> TripleSet {
    triples.into_iter().collect()
}

fn start_pipeline(executor: &Executor, triples: Vec<Triple>) -> PipelineHandle {
    let graph = executor.compile(&description(triples)).expect("workflow must compile");
    executor.start(&graph).expect("pipeline must start")
}

async fn results_within(handle: &PipelineHandle, path: &PathId, seconds: u64) -> TripleSet {
    timeout(Duration::from_secs(seconds), handle.next_results(path))
        .await
        .expect("result retrieval timed out")
        .expect("result retrieval failed")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_linear_round_trip() {
    let mut registry = PluginRegistry::new();
    registry.register(ECHO_TYPE, || Arc::new(EchoPlugin::new("urn:test:echo")));
    let executor = Executor::new(registry);

    let handle = start_pipeline(
        &executor,
        vec![
            t("urn:wf:a", voc::RDF_TYPE, ECHO_TYPE),
            t("urn:wf:b", voc::RDF_TYPE, ECHO_TYPE),
            t("urn:wf:a", voc::CONNECTS_TO, "urn:wf:b"),
            t(PATH, voc::HAS_INPUT, "urn:wf:a"),
            t(PATH, voc::HAS_OUTPUT, "urn:wf:b"),
            t("urn:endpoint:sparql", voc::RDF_TYPE, voc::SPARQL_ENDPOINT),
            t("urn:endpoint:sparql", voc::LINKS, PATH),
        ],
    );

    let path = PathId::new(PATH);
    let query = "SELECT ?s WHERE { ?s ?p ?o }";

    handle.execute(query, &path).expect("query injection must succeed");
    let results = results_within(&handle, &path, 5).await;

    // The query triples round-trip through both identity nodes unchanged.
    assert_eq!(results.len(), 2);
    let subjects = results.subjects_of(voc::RDF_TYPE);
    assert_eq!(subjects.len(), 1);
    let query_node = subjects[0].to_string();
    assert_eq!(results.object_of(&query_node, voc::RDF_TYPE), Some(voc::SPARQL_QUERY));
    assert_eq!(results.object_of(&query_node, voc::HAS_SERIALIZED_FORM), Some(query));

    // The endpoint declared in the description is resolvable at runtime.
    let endpoint = handle.endpoint("urn:endpoint:sparql").expect("endpoint must be known");
    assert_eq!(endpoint.linked_path, path);

    // The worker loops return to their waiting state and serve a second query.
    let second_query = "ASK { ?s ?p ?o }";
    handle.execute(second_query, &path).expect("second query injection must succeed");
    let second = results_within(&handle, &path, 5).await;
    let second_node = second.subjects_of(voc::RDF_TYPE)[0].to_string();
    assert_eq!(second.object_of(&second_node, voc::HAS_SERIALIZED_FORM), Some(second_query));

    timeout(Duration::from_secs(5), handle.terminate()).await.expect("terminate timed out");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fan_in_proceeds_after_two_of_three() {
    const SOURCE_A: &str = "urn:test:SourceA";
    const SOURCE_B: &str = "urn:test:SourceB";
    const SOURCE_C: &str = "urn:test:SourceC";

    let combine = |first: &TripleSet, second: &TripleSet| -> HashSet<Triple> {
        first.iter().chain(second.iter()).cloned().collect()
    };

    let payload_a = payload_of("a");
    let payload_b = payload_of("b");
    let payload_c = payload_of("c");

    let valid_combinations = [
        combine(&payload_a, &payload_b),
        combine(&payload_a, &payload_c),
        combine(&payload_b, &payload_c),
    ];

    // The merge is race-dependent by design; several runs must each
    // produce one of the valid two-producer combinations.
    for _ in 0..5 {
        let mut registry = PluginRegistry::new();
        let (a, b, c) = (payload_a.clone(), payload_b.clone(), payload_c.clone());
        registry.register(SOURCE_A, move || Arc::new(SourcePlugin::new("urn:test:source-a", a.clone())));
        registry.register(SOURCE_B, move || Arc::new(SourcePlugin::new("urn:test:source-b", b.clone())));
        registry.register(SOURCE_C, move || Arc::new(SourcePlugin::new("urn:test:source-c", c.clone())));
        registry.register(ECHO_TYPE, || Arc::new(EchoPlugin::new("urn:test:echo")));
        let executor = Executor::new(registry);

        let handle = start_pipeline(
            &executor,
            vec![
                t("urn:wf:a", voc::RDF_TYPE, SOURCE_A),
                t("urn:wf:b", voc::RDF_TYPE, SOURCE_B),
                t("urn:wf:c", voc::RDF_TYPE, SOURCE_C),
                t("urn:wf:d", voc::RDF_TYPE, ECHO_TYPE),
                t("urn:wf:a", voc::CONNECTS_TO, "urn:wf:d"),
                t("urn:wf:b", voc::CONNECTS_TO, "urn:wf:d"),
                t("urn:wf:c", voc::CONNECTS_TO, "urn:wf:d"),
                t("urn:wf:d", voc::HAS_INPUT_BEHAVIOUR, "2"),
                t(PATH, voc::HAS_INPUT, "urn:wf:a"),
                t(PATH, "http://ns.reasoning-grid.org/workflow#hasInput1", "urn:wf:b"),
                t(PATH, "http://ns.reasoning-grid.org/workflow#hasInput2", "urn:wf:c"),
                t(PATH, voc::HAS_OUTPUT, "urn:wf:d"),
            ],
        );

        let path = PathId::new(PATH);
        handle.execute("SELECT * WHERE { ?s ?p ?o }", &path).expect("query injection must succeed");

        let results = results_within(&handle, &path, 5).await;
        let result_set: HashSet<Triple> = results.iter().cloned().collect();

        assert_eq!(results.len(), 2, "exactly two producers must have contributed");
        assert!(
            valid_combinations.contains(&result_set),
            "result {:?} is not a valid 2-of-3 combination",
            result_set
        );

        timeout(Duration::from_secs(5), handle.terminate()).await.expect("terminate timed out");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_split_invocation_is_transparent() {
    const SOURCE_TYPE: &str = "urn:test:BulkSource";

    let bulk: TripleSet =
        (0..6).map(|i| Triple::new(format!("urn:data:{}", i), "urn:test:value", format!("v{}", i))).collect();
    let expected: HashSet<Triple> = bulk.iter().map(TagPlugin::tag).collect();

    let triples = |splittable: bool| {
        let mut description = vec![
            t("urn:wf:source", voc::RDF_TYPE, SOURCE_TYPE),
            t("urn:wf:tagger", voc::RDF_TYPE, TAG_TYPE),
            t("urn:wf:source", voc::CONNECTS_TO, "urn:wf:tagger"),
            t(PATH, voc::HAS_INPUT, "urn:wf:source"),
            t(PATH, voc::HAS_OUTPUT, "urn:wf:tagger"),
        ];
        if splittable {
            description.push(t("urn:wf:tagger", voc::IS_INPUT_SPLITTABLE, "true"));
        }
        description
    };

    let mut split_result = None;
    let mut batch_result = None;

    for (splittable, slot) in [(true, &mut split_result), (false, &mut batch_result)] {
        let mut registry = PluginRegistry::new();
        let payload = bulk.clone();
        registry.register(SOURCE_TYPE, move || Arc::new(SourcePlugin::new("urn:test:bulk", payload.clone())));
        registry.register(TAG_TYPE, || Arc::new(TagPlugin));
        let executor = Executor::new(registry);

        let handle = start_pipeline(&executor, triples(splittable));
        let path = PathId::new(PATH);
        handle.execute("SELECT * WHERE { ?s ?p ?o }", &path).expect("query injection must succeed");

        let results = results_within(&handle, &path, 5).await;
        *slot = Some(results.iter().cloned().collect::<HashSet<Triple>>());

        timeout(Duration::from_secs(5), handle.terminate()).await.expect("terminate timed out");
    }

    let split_result = split_result.expect("split run must produce a result");
    let batch_result = batch_result.expect("batch run must produce a result");

    assert_eq!(split_result, expected);
    assert_eq!(split_result, batch_result);
}

struct RejectingTransfer;

#[async_trait]
impl FileTransfer for RejectingTransfer {
    async fn copy_to(&self, _local: &std::path::Path, _remote: &str) -> Result<()> {
        Ok(())
    }

    async fn copy_from(&self, remote: &str, _local: &std::path::Path) -> Result<()> {
        Err(Error::RemoteExecutionError(format!("injected stage-out failure for '{}'", remote)))
    }
}

struct InstantBroker;

#[async_trait]
impl ResourceBroker for InstantBroker {
    async fn submit(&self, _spec: &JobSpec) -> Result<JobId> {
        Ok(JobId::new("job-instant"))
    }

    async fn state(&self, _job: &JobId) -> Result<JobState> {
        Ok(JobState::Succeeded)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remote_stage_out_failure_yields_empty_result() {
    let mut registry = PluginRegistry::new();
    registry.register(ECHO_TYPE, || Arc::new(EchoPlugin::new("urn:test:echo")));

    let executor =
        Executor::new(registry).with_grid_backends(Arc::new(RejectingTransfer), Arc::new(InstantBroker));

    let handle = start_pipeline(
        &executor,
        vec![
            t("urn:wf:a", voc::RDF_TYPE, ECHO_TYPE),
            t("urn:wf:b", voc::RDF_TYPE, ECHO_TYPE),
            t("urn:wf:a", voc::CONNECTS_TO, "urn:wf:b"),
            t(PATH, voc::HAS_INPUT, "urn:wf:a"),
            t(PATH, voc::HAS_OUTPUT, "urn:wf:b"),
            t("urn:wf:b", voc::RUNS_ON, "_:res"),
            t("_:res", voc::RDF_TYPE, voc::GRID_RESOURCE),
            t("_:res", voc::RESOURCE_URI, "gsiftp://cluster.example.org"),
            t("_:res", voc::WORK_DIR, "/scratch/jobs"),
            t("_:res", voc::RUNTIME_DIR, "/opt/platform/bin"),
        ],
    );

    let path = PathId::new(PATH);
    handle.execute("SELECT * WHERE { ?s ?p ?o }", &path).expect("query injection must succeed");

    // The stage-out failure is downgraded: the caller gets an empty
    // result instead of an error or a hang.
    let results = results_within(&handle, &path, 10).await;
    assert!(results.is_empty());

    timeout(Duration::from_secs(5), handle.terminate()).await.expect("terminate timed out");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_terminate_releases_worker_blocked_in_gather() {
    let shutdowns = Arc::new(AtomicUsize::new(0));

    let mut registry = PluginRegistry::new();
    let counter = shutdowns.clone();
    registry.register(ECHO_TYPE, move || {
        Arc::new(EchoPlugin::with_counter("urn:test:echo", counter.clone()))
    });
    registry.register(FAILING_TYPE, || Arc::new(FailingPlugin));
    let executor = Executor::new(registry);

    // The failing producer's worker dies without emitting, leaving the
    // merge node parked in its gather with one of two contributions.
    let handle = start_pipeline(
        &executor,
        vec![
            t("urn:wf:a", voc::RDF_TYPE, ECHO_TYPE),
            t("urn:wf:f", voc::RDF_TYPE, FAILING_TYPE),
            t("urn:wf:d", voc::RDF_TYPE, ECHO_TYPE),
            t("urn:wf:a", voc::CONNECTS_TO, "urn:wf:d"),
            t("urn:wf:f", voc::CONNECTS_TO, "urn:wf:d"),
            t(PATH, voc::HAS_INPUT, "urn:wf:a"),
            t(PATH, "http://ns.reasoning-grid.org/workflow#hasInput1", "urn:wf:f"),
            t(PATH, voc::HAS_OUTPUT, "urn:wf:d"),
        ],
    );

    let path = PathId::new(PATH);
    handle.execute("SELECT * WHERE { ?s ?p ?o }", &path).expect("query injection must succeed");

    // Give the pipeline time to reach the blocked gather.
    tokio::time::sleep(Duration::from_millis(200)).await;

    timeout(Duration::from_secs(5), handle.terminate()).await.expect("terminate must not deadlock");

    // Both echo workers released their plugin exactly once; the failing
    // worker terminated through the fail-hard policy instead.
    assert_eq!(shutdowns.load(Ordering::SeqCst), 2);
}
