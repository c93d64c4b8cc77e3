use std::sync::Arc;
use std::time::Duration;

use flare_core::{models::JobCompleteMessage, ChannelNames, FlareError, MessageBus, ShutdownManager};
use flare_infrastructure::InMemoryMessageBus;
use flare_orchestrator::{IngressListener, JobCoordinator};
use flare_testing_utils::{
    create_job_payload, nodes_with_successes, test_config, JobBuilder, MockJobsApi,
    SequentialIdGenerator, SimulatedWorkerFleet, TaskBuilder, TestEnv,
};

struct Setup {
    bus: InMemoryMessageBus,
    channels: ChannelNames,
    jobs_api: MockJobsApi,
    listener: Arc<IngressListener>,
}

fn setup() -> Setup {
    let config = test_config();
    let bus = InMemoryMessageBus::new();
    let channels = ChannelNames::new(config.channels.clone());
    let fleet = SimulatedWorkerFleet::new(bus.clone(), channels.clone());
    let jobs_api = MockJobsApi::new();

    let coordinator = Arc::new(JobCoordinator::new(
        &config,
        Arc::new(fleet),
        Arc::new(bus.clone()),
        Arc::new(jobs_api.clone()),
        Arc::new(SequentialIdGenerator::new("node")),
    ));
    let listener = Arc::new(IngressListener::new(
        coordinator,
        Arc::new(bus.clone()),
        &channels,
    ));

    Setup {
        bus,
        channels,
        jobs_api,
        listener,
    }
}

#[tokio::test]
async fn test_create_job_runs_to_completion() {
    let s = setup();
    let job = JobBuilder::new().with_id("job1").build();
    let task = TaskBuilder::new().with_simulators(&[1000, 1067]).build();
    s.jobs_api
        .set_nodes("job1", nodes_with_successes("job1", &[1000, 1000, 0]));

    let mut done = s
        .bus
        .subscribe_fanout(&s.channels.job_complete("job1"))
        .await
        .unwrap();

    let manager = ShutdownManager::new();
    let listener = s.listener.clone();
    let shutdown = manager.subscribe();
    let handle = tokio::spawn(async move { listener.run(shutdown).await });

    // 无法解析的消息被丢弃，后续消息照常处理
    s.bus.publish_to_queue("job.create", b"not json").await.unwrap();
    s.bus
        .publish_to_queue("job.create", &create_job_payload(&job, &task))
        .await
        .unwrap();

    let payload = tokio::time::timeout(Duration::from_secs(10), done.next_message())
        .await
        .expect("等待任务完成广播超时")
        .unwrap()
        .unwrap();
    let message: JobCompleteMessage = serde_json::from_slice(&payload).unwrap();
    assert!(message.done);
    assert!(message.passed);

    let updated = s.jobs_api.updated_jobs();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id, "job1");

    manager.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("监听器未退出")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_concurrent_requests_run_independently() {
    let s = setup();
    let manager = ShutdownManager::new();
    let listener = s.listener.clone();
    let shutdown = manager.subscribe();
    let handle = tokio::spawn(async move { listener.run(shutdown).await });

    for (job_id, simulators) in [("job-a", 500), ("job-b", 2500)] {
        s.jobs_api
            .set_nodes(job_id, nodes_with_successes(job_id, &[simulators]));
        let job = JobBuilder::new().with_id(job_id).build();
        let task = TaskBuilder::new().with_simulators(&[simulators]).build();
        s.bus
            .publish_to_queue("job.create", &create_job_payload(&job, &task))
            .await
            .unwrap();
    }

    let jobs_api = s.jobs_api.clone();
    let finished = TestEnv::wait_for(
        || {
            let jobs_api = jobs_api.clone();
            async move { jobs_api.updated_jobs().len() == 2 }
        },
        Duration::from_secs(10),
    )
    .await;
    assert!(finished);

    let mut ids: Vec<_> = s.jobs_api.updated_jobs().into_iter().map(|j| j.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["job-a".to_string(), "job-b".to_string()]);
    assert!(s.jobs_api.updated_jobs().iter().all(|j| j.passed));

    manager.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_jobs() {
    let config = test_config();
    let bus = InMemoryMessageBus::new();
    let channels = ChannelNames::new(config.channels.clone());
    let fleet = SimulatedWorkerFleet::new(bus.clone(), channels.clone()).with_silent_monitor();
    let jobs_api = MockJobsApi::new();
    let coordinator = Arc::new(JobCoordinator::new(
        &config,
        Arc::new(fleet),
        Arc::new(bus.clone()),
        Arc::new(jobs_api.clone()),
        Arc::new(SequentialIdGenerator::new("node")),
    ));
    let listener = IngressListener::new(coordinator, Arc::new(bus.clone()), &channels);

    let job = JobBuilder::new().with_id("job1").build();
    let task = TaskBuilder::new().with_simulators(&[10]).build();
    bus.publish_to_queue("job.create", &create_job_payload(&job, &task))
        .await
        .unwrap();

    let manager = ShutdownManager::new();
    let shutdown = manager.subscribe();
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        manager.shutdown();
    };

    let (result, _) = tokio::time::timeout(
        Duration::from_secs(5),
        async { tokio::join!(listener.run(shutdown), canceller) },
    )
    .await
    .expect("监听器未在关闭后退出");

    assert!(result.is_ok());
    assert!(jobs_api.updated_jobs().is_empty());
}

#[tokio::test]
async fn test_closed_queue_is_reported() {
    use flare_core::Subscription;
    use futures::stream;

    struct ClosedBus;

    #[async_trait::async_trait]
    impl MessageBus for ClosedBus {
        async fn subscribe_queue(&self, queue: &str, _durable: bool) -> flare_core::FlareResult<Subscription> {
            Ok(Subscription::new(queue, stream::empty()))
        }
        async fn delete_queue(&self, _queue: &str) -> flare_core::FlareResult<()> {
            Ok(())
        }
        async fn publish_to_queue(&self, _queue: &str, _payload: &[u8]) -> flare_core::FlareResult<()> {
            Ok(())
        }
        async fn publish_fanout(&self, _exchange: &str, _payload: &[u8]) -> flare_core::FlareResult<()> {
            Ok(())
        }
        async fn subscribe_fanout(&self, exchange: &str) -> flare_core::FlareResult<Subscription> {
            Ok(Subscription::new(exchange, stream::empty()))
        }
    }

    let config = test_config();
    let channels = ChannelNames::new(config.channels.clone());
    let bus: Arc<dyn MessageBus> = Arc::new(ClosedBus);
    let coordinator = Arc::new(JobCoordinator::new(
        &config,
        Arc::new(flare_testing_utils::MockWorkerLauncher::new()),
        bus.clone(),
        Arc::new(MockJobsApi::new()),
        Arc::new(SequentialIdGenerator::new("node")),
    ));
    let listener = IngressListener::new(coordinator, bus, &channels);

    let err = listener
        .run(ShutdownManager::new().subscribe())
        .await
        .unwrap_err();
    assert!(matches!(err, FlareError::ChannelClosed(name) if name == "job.create"));
}
