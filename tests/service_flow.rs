use std::collections::BTreeMap;
use std::sync::Arc;

use raffle_backend::AppError;
use raffle_backend::config::{DatabaseConfig, RaffleConfig};
use raffle_backend::database::{DbPool, create_pool, run_migrations};
use raffle_backend::entities::{allocation_entity as allocations, run_entity as runs};
use raffle_backend::models::ImportItemRow;
use raffle_backend::services::*;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use tokio::sync::Mutex;

struct Services {
    pool: DbPool,
    participants: ParticipantService,
    items: ItemService,
    votes: VoteService,
    draws: DrawService,
    meta: MetaService,
}

// one connection: every connection to sqlite::memory: is its own database
async fn setup(rules: RaffleConfig) -> Services {
    let pool: DbPool = create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .unwrap();
    run_migrations(&pool).await.unwrap();

    let lock: AdminLock = Arc::new(Mutex::new(()));
    let votes = VoteService::new(pool.clone(), rules.clone());
    Services {
        participants: ParticipantService::new(pool.clone(), lock.clone()),
        items: ItemService::new(pool.clone(), lock.clone()),
        draws: DrawService::new(
            pool.clone(),
            votes.clone(),
            rules.win_penalty(),
            rules.point_budget,
            lock,
        ),
        votes,
        meta: MetaService::new(pool.clone()),
        pool,
    }
}

fn row(name: &str, category: &str, quantity: i64) -> ImportItemRow {
    ImportItemRow {
        name: name.to_string(),
        category: Some(category.to_string()),
        quantity: Some(json!(quantity)),
    }
}

/// Item ids keyed by name.
async fn item_ids(s: &Services) -> BTreeMap<String, i64> {
    s.items
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|it| (it.name, it.id))
        .collect()
}

async fn seed_catalog(s: &Services) -> (Vec<i64>, BTreeMap<String, i64>) {
    s.items
        .import(&[
            row("Lamp", "Home", 2),
            row("Chair", "Home", 1),
            row("Tent", "Outdoor", 3),
        ])
        .await
        .unwrap();
    let ids = item_ids(s).await;

    let mut people = Vec::new();
    for name in ["ana", "ben", "cleo"] {
        people.push(s.participants.register(name).await.unwrap().id);
    }

    let ballots = [
        [("Lamp", 60), ("Chair", 40), ("Tent", 0)],
        [("Lamp", 10), ("Chair", 10), ("Tent", 80)],
        [("Lamp", 34), ("Chair", 33), ("Tent", 33)],
    ];
    for (pid, ballot) in people.iter().zip(ballots) {
        let raw: BTreeMap<i64, i32> = ballot.iter().map(|(n, p)| (ids[*n], *p)).collect();
        s.votes.submit_votes(*pid, &raw).await.unwrap();
    }
    (people, ids)
}

#[tokio::test]
async fn register_returns_existing_participant_for_same_name() {
    let s = setup(RaffleConfig::default()).await;

    let first = s.participants.register("  Dana ").await.unwrap();
    let again = s.participants.register("Dana").await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(again.name, "Dana");
    assert_eq!(s.participants.list().await.unwrap().len(), 1);

    assert!(matches!(
        s.participants.register("   ").await,
        Err(AppError::ValidationError(_))
    ));
}

#[tokio::test]
async fn vote_submission_replaces_the_whole_set() {
    let s = setup(RaffleConfig::default()).await;
    s.items
        .import(&[row("Lamp", "Home", 1), row("Chair", "Home", 1)])
        .await
        .unwrap();
    let ids = item_ids(&s).await;
    let pid = s.participants.register("ana").await.unwrap().id;

    let first = BTreeMap::from([(ids["Lamp"], 30), (ids["Chair"], 70)]);
    s.votes.submit_votes(pid, &first).await.unwrap();

    let second = BTreeMap::from([(ids["Lamp"], 100)]);
    s.votes.submit_votes(pid, &second).await.unwrap();

    assert_eq!(s.votes.get_votes(pid).await.unwrap(), second);
    assert_eq!(s.votes.vote_sum(pid).await.unwrap(), 100);
    assert!(s.votes.status(pid).await.unwrap().submitted);
}

#[tokio::test]
async fn rejected_submission_keeps_previous_votes() {
    let s = setup(RaffleConfig::default()).await;
    s.items.import(&[row("Lamp", "Home", 1)]).await.unwrap();
    let ids = item_ids(&s).await;
    let pid = s.participants.register("ana").await.unwrap().id;

    let stored = BTreeMap::from([(ids["Lamp"], 100)]);
    s.votes.submit_votes(pid, &stored).await.unwrap();
    let before = s.meta.versions().await.unwrap();

    let short = BTreeMap::from([(ids["Lamp"], 40)]);
    assert!(matches!(
        s.votes.submit_votes(pid, &short).await,
        Err(AppError::ValidationError(_))
    ));

    let unknown = BTreeMap::from([(ids["Lamp"], 50), (9_999, 50)]);
    assert!(matches!(
        s.votes.submit_votes(pid, &unknown).await,
        Err(AppError::ValidationError(_))
    ));

    assert_eq!(s.votes.get_votes(pid).await.unwrap(), stored);
    assert_eq!(s.meta.versions().await.unwrap().votes_version, before.votes_version);
}

#[tokio::test]
async fn draw_allocates_every_unit_and_is_reproducible() {
    let s = setup(RaffleConfig::default()).await;
    let (people, _) = seed_catalog(&s).await;
    let versions_before = s.meta.versions().await.unwrap();

    let first = s.draws.run_draw(Some("spring-fair".to_string())).await.unwrap();
    assert_eq!(first.seed, "spring-fair");
    assert_eq!(first.allocation_count, 2 + 1 + 3);

    let rows = s.draws.allocations_for_run(&first.run_id).await.unwrap();
    assert_eq!(rows.len(), 6);
    assert!(
        rows.iter()
            .all(|r| r.participant_id.is_none_or(|pid| people.contains(&pid)))
    );
    let first_order: Vec<(i64, Option<i64>)> =
        rows.iter().map(|r| (r.item_id, r.participant_id)).collect();

    let versions_after = s.meta.versions().await.unwrap();
    assert_eq!(versions_after.alloc_version, versions_before.alloc_version + 1);

    s.draws.clear_results().await.unwrap();
    assert!(s.draws.latest_results().await.unwrap().is_none());

    let second = s.draws.run_draw(Some("spring-fair".to_string())).await.unwrap();
    let second_order: Vec<(i64, Option<i64>)> = s
        .draws
        .allocations_for_run(&second.run_id)
        .await
        .unwrap()
        .iter()
        .map(|r| (r.item_id, r.participant_id))
        .collect();
    assert_eq!(first_order, second_order);
}

#[tokio::test]
async fn repeated_draw_replaces_previous_results() {
    let s = setup(RaffleConfig::default()).await;
    seed_catalog(&s).await;

    let first = s.draws.run_draw(Some("one".to_string())).await.unwrap();
    let first_rows = s.draws.allocations_for_run(&first.run_id).await.unwrap();
    assert_eq!(first_rows.len(), 6);

    let second = s.draws.run_draw(Some("two".to_string())).await.unwrap();
    assert_eq!(second.allocation_count, 6);

    assert_eq!(runs::Entity::find().count(&s.pool).await.unwrap(), 1);
    assert_eq!(allocations::Entity::find().count(&s.pool).await.unwrap(), 6);

    let latest = s.draws.latest_run().await.unwrap().unwrap();
    assert_eq!(latest.id, second.run_id);
    assert_eq!(latest.seed, "two");

    let second_rows = s.draws.allocations_for_run(&second.run_id).await.unwrap();
    assert_eq!(second_rows.len(), 6);
    assert!(second_rows.iter().all(|r| r.run_id == second.run_id));
}

#[tokio::test]
async fn draw_stores_seed_as_given() {
    let s = setup(RaffleConfig::default()).await;
    seed_catalog(&s).await;

    let draw = s.draws.run_draw(Some("  s  ".to_string())).await.unwrap();
    assert_eq!(draw.seed, "  s  ");
    let run = s.draws.latest_run().await.unwrap().unwrap();
    assert_eq!(run.seed, "  s  ");

    let blank = s.draws.run_draw(Some("   ".to_string())).await.unwrap();
    assert!(blank.seed.parse::<i64>().is_ok());
}

#[tokio::test]
async fn phase_a_rows_come_first_and_carry_snapshots() {
    let s = setup(RaffleConfig::default()).await;
    seed_catalog(&s).await;

    let draw = s.draws.run_draw(Some("42".to_string())).await.unwrap();
    let rows = s.draws.allocations_for_run(&draw.run_id).await.unwrap();

    let phases: Vec<&str> = rows
        .iter()
        .map(|r| r.weight_snapshot["phase"].as_str().unwrap())
        .collect();
    // three participants and six units: one Phase A pick each, the rest Phase B
    assert_eq!(&phases[..3], &["A", "A", "A"]);
    assert!(phases[3..].iter().all(|p| *p == "B" || *p == "B_rest"));

    let results = s.draws.latest_results().await.unwrap().unwrap();
    assert_eq!(results.run.id, draw.run_id);
    assert_eq!(results.allocations.len(), 6);
    let total: usize = results.by_participant.iter().map(|w| w.count).sum();
    assert_eq!(total, 6);
}

#[tokio::test]
async fn failed_draw_leaves_state_untouched() {
    let s = setup(RaffleConfig::default()).await;
    s.participants.register("ana").await.unwrap();
    let before = s.meta.versions().await.unwrap();

    assert!(matches!(
        s.draws.run_draw(None).await,
        Err(AppError::DrawError(_))
    ));
    assert!(s.draws.latest_run().await.unwrap().is_none());
    assert_eq!(s.meta.versions().await.unwrap().alloc_version, before.alloc_version);

    let s = setup(RaffleConfig::default()).await;
    s.items.import(&[row("Lamp", "Home", 1)]).await.unwrap();
    assert!(matches!(
        s.draws.run_draw(Some("x".to_string())).await,
        Err(AppError::DrawError(_))
    ));
    assert!(s.draws.latest_run().await.unwrap().is_none());
}

#[tokio::test]
async fn import_clears_votes_and_results() {
    let s = setup(RaffleConfig::default()).await;
    let (people, _) = seed_catalog(&s).await;
    s.draws.run_draw(Some("before-import".to_string())).await.unwrap();

    let imported = s
        .items
        .import(&[
            row("Kettle", "Kitchen", 1),
            ImportItemRow {
                name: "   ".to_string(),
                category: None,
                quantity: None,
            },
        ])
        .await
        .unwrap();
    assert_eq!(imported, 1);

    assert!(s.votes.get_votes(people[0]).await.unwrap().is_empty());
    assert!(s.draws.latest_run().await.unwrap().is_none());
    assert_eq!(s.items.list().await.unwrap().len(), 1);
    // participants survive an import
    assert_eq!(s.participants.list().await.unwrap().len(), 3);
}

#[tokio::test]
async fn deleting_participant_removes_votes_and_allocations() {
    let s = setup(RaffleConfig::default()).await;
    let (people, _) = seed_catalog(&s).await;
    let draw = s.draws.run_draw(Some("cascade".to_string())).await.unwrap();

    let gone = people[1];
    s.participants.delete(gone).await.unwrap();

    assert!(matches!(
        s.participants.get(gone).await,
        Err(AppError::NotFound(_))
    ));
    assert!(s.votes.get_votes(gone).await.unwrap().is_empty());
    let rows = s.draws.allocations_for_run(&draw.run_id).await.unwrap();
    assert!(rows.iter().all(|r| r.participant_id != Some(gone)));

    assert!(matches!(
        s.participants.delete(gone).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn totals_and_overview_reflect_votes() {
    let s = setup(RaffleConfig::default()).await;
    seed_catalog(&s).await;
    s.participants.register("late").await.unwrap();

    let totals = s.items.list_with_totals().await.unwrap();
    assert_eq!(totals[0].name, "Tent");
    assert_eq!(totals[0].total_points, 113);
    assert_eq!(totals[0].voters, 2);

    let overview = s.draws.overview().await.unwrap();
    assert_eq!(overview.item_count, 3);
    assert_eq!(overview.participant_count, 4);
    assert_eq!(overview.submitted_count, 3);
    assert!(overview.latest_run_id.is_none());
}
