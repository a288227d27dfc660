use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use taxdesk::AppCommand;
use taxdesk::cli::finance::{ExpenseAction, RetainerAction};
use taxdesk::cli::goals::GoalAction;
use taxdesk::cli::users::UserAction;
use taxdesk::core::goals::GoalFilter;
use taxdesk::core::period::GoalPeriod;
use taxdesk::core::Session;
use taxdesk::core::records::{Goal, PaymentStatus, Profile, Retainer, RetainerPayment};
use taxdesk::core::roles::Role;
use taxdesk::core::store::{Query, fetch_records};
use taxdesk::run_command_on;
use taxdesk::services::finance::load_dashboard;
use taxdesk::store::disk::LocalStore;
use taxdesk::store::rest::RestStore;
use tempfile::TempDir;
use tracing::info;

mod test_utils {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_rest_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", "eq.u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "u1", "name": "Ana", "role": "manager"}
            ])))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn mount_table(server: &MockServer, table: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{table}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

fn write_local_config(dir: &Path, user_id: Option<&str>) -> PathBuf {
    let config_path = dir.join("config.yaml");
    let data_path = dir.join("data");
    let user_line = user_id.map_or("user_id: null".to_string(), |id| format!("user_id: \"{id}\""));
    let config = format!(
        "store:\n  backend: local\n  data_path: \"{}\"\nsession:\n  {}\ncurrency: \"BRL\"\n",
        data_path.display(),
        user_line
    );
    fs::write(&config_path, config).unwrap();
    config_path
}

async fn run(command: AppCommand, config_path: &Path) -> anyhow::Result<()> {
    run_command_on(command, Some(config_path.to_str().unwrap()), today()).await
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_local_store() {
    let temp_dir = TempDir::new().unwrap();
    let data_path = temp_dir.path().join("data");

    // Nobody exists yet: the first profile can be added anonymously.
    let anonymous_config = write_local_config(temp_dir.path(), None);
    run(
        AppCommand::User(UserAction::Add {
            name: "Ana".to_string(),
            role: Role::Manager,
            email: None,
            id: Some("u1".to_string()),
        }),
        &anonymous_config,
    )
    .await
    .unwrap();

    let denied = run(AppCommand::Finance, &anonymous_config).await;
    assert!(denied.is_err());

    let config_path = write_local_config(temp_dir.path(), Some("u1"));
    run(
        AppCommand::Retainer(RetainerAction::Add {
            client_name: "ACME".to_string(),
            monthly_fee: 1000.0,
            commission: None,
            start_date: Some(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
        }),
        &config_path,
    )
    .await
    .unwrap();

    let retainer_id = {
        let store = LocalStore::open(&data_path).unwrap();
        let retainers: Vec<Retainer> = fetch_records(&store, &Query::new()).await.unwrap();
        assert_eq!(retainers.len(), 1);
        assert_eq!(retainers[0].our_share, 200.0);
        retainers[0].id.clone()
    };

    for _ in 0..2 {
        run(
            AppCommand::Retainer(RetainerAction::Pay {
                id: retainer_id.clone(),
            }),
            &config_path,
        )
        .await
        .unwrap();
    }

    run(
        AppCommand::Expense(ExpenseAction::Add {
            description: "Aluguel".to_string(),
            amount: 150.0,
            category: None,
            date: None,
        }),
        &config_path,
    )
    .await
    .unwrap();

    run(
        AppCommand::Goal(GoalAction::Add {
            kind: "Reuniões Agendadas".to_string(),
            target: 10,
            user: Some("u1".to_string()),
            period: GoalPeriod::Mensal,
        }),
        &config_path,
    )
    .await
    .unwrap();

    run(AppCommand::Finance, &config_path).await.unwrap();
    run(
        AppCommand::Goals {
            filter: GoalFilter::Mine,
        },
        &config_path,
    )
    .await
    .unwrap();
    run(
        AppCommand::Retainer(RetainerAction::History {
            id: retainer_id.clone(),
        }),
        &config_path,
    )
    .await
    .unwrap();

    let store = LocalStore::open(&data_path).unwrap();
    let payments: Vec<RetainerPayment> = fetch_records(&store, &Query::new()).await.unwrap();
    info!(?payments, "Stored payments");
    assert_eq!(payments.len(), 1, "paying twice in a month keeps one payment");
    assert_eq!(payments[0].status, PaymentStatus::Paid);
    assert_eq!(
        payments[0].due_date,
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    );

    let goals: Vec<Goal> = fetch_records(&store, &Query::new()).await.unwrap();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].current_value, 0);
    drop(store);

    run(
        AppCommand::User(UserAction::Add {
            name: "Bruno".to_string(),
            role: Role::Analyst,
            email: None,
            id: Some("u2".to_string()),
        }),
        &config_path,
    )
    .await
    .unwrap();
    run(
        AppCommand::User(UserAction::Edit {
            name: Some("Ana Souza".to_string()),
            email: Some("ana@example.com".to_string()),
            avatar_url: None,
        }),
        &config_path,
    )
    .await
    .unwrap();
    let self_delete = run(
        AppCommand::User(UserAction::Delete {
            user_id: "u1".to_string(),
        }),
        &config_path,
    )
    .await;
    assert!(self_delete.is_err());
    run(
        AppCommand::User(UserAction::Delete {
            user_id: "u2".to_string(),
        }),
        &config_path,
    )
    .await
    .unwrap();

    let store = LocalStore::open(&data_path).unwrap();
    let profiles: Vec<Profile> = fetch_records(&store, &Query::new()).await.unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].display_name(), "Ana Souza");
    assert_eq!(profiles[0].email.as_deref(), Some("ana@example.com"));
}

#[test_log::test(tokio::test)]
async fn test_unknown_session_user_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_local_config(temp_dir.path(), Some("ghost"));

    let result = run(AppCommand::Goals { filter: GoalFilter::All }, &config_path).await;
    let error = result.unwrap_err();
    assert!(format!("{error:#}").contains("ghost"));
}

#[test_log::test(tokio::test)]
async fn test_finance_dashboard_with_rest_mock() {
    let server = test_utils::create_rest_server().await;
    test_utils::mount_table(
        &server,
        "financial_recoveries",
        200,
        serde_json::json!([{
            "id": "rec1",
            "client_name": "Padaria",
            "total_recovered": 10000,
            "partner_percent": 50,
            "partner_amount": 1500,
            "my_company_amount": 600,
            "status": "paid",
            "created_at": "2025-06-02T10:00:00+00:00"
        }]),
    )
    .await;
    test_utils::mount_table(
        &server,
        "financial_retainers",
        200,
        serde_json::json!([{
            "id": "r1",
            "client_name": "ACME",
            "monthly_fee": 1000,
            "commission_percent": null,
            "active": true
        }]),
    )
    .await;
    test_utils::mount_table(
        &server,
        "financial_retainer_payments",
        200,
        serde_json::json!([{
            "id": "p1",
            "retainer_id": "r1",
            "due_date": "2025-06-10",
            "payment_date": null,
            "amount": 1000,
            "status": "paid"
        }]),
    )
    .await;
    test_utils::mount_table(&server, "financial_expenses", 200, serde_json::json!([])).await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    let config = format!(
        "store:\n  backend: rest\n  rest:\n    base_url: \"{}\"\n    api_key: \"anon\"\nsession:\n  user_id: \"u1\"\n",
        server.uri()
    );
    fs::write(&config_path, config).unwrap();

    run(AppCommand::Finance, &config_path).await.unwrap();

    let store = RestStore::new(&server.uri(), "anon");
    let session = Session::resolve(&store, Some("u1")).await.unwrap();
    let snapshot = load_dashboard(&store, &session, today()).await.unwrap();
    // 600 from the paid recovery plus 20% of the 1000 retainer payment.
    assert_eq!(snapshot.metrics.realized_revenue, 800.0);
    assert_eq!(snapshot.metrics.total_recovered_volume, 10000.0);
    assert_eq!(snapshot.active_retainers.len(), 1);
    assert_eq!(snapshot.current_month_payments.len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_finance_dashboard_fails_when_a_table_fails() {
    let server = test_utils::create_rest_server().await;
    test_utils::mount_table(&server, "financial_recoveries", 200, serde_json::json!([])).await;
    test_utils::mount_table(&server, "financial_retainers", 200, serde_json::json!([])).await;
    test_utils::mount_table(
        &server,
        "financial_retainer_payments",
        503,
        serde_json::json!({"message": "unavailable"}),
    )
    .await;
    test_utils::mount_table(&server, "financial_expenses", 200, serde_json::json!([])).await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    let config = format!(
        "store:\n  backend: rest\n  rest:\n    base_url: \"{}\"\n    api_key: \"anon\"\nsession:\n  user_id: \"u1\"\n",
        server.uri()
    );
    fs::write(&config_path, config).unwrap();

    let error = run(AppCommand::Finance, &config_path).await.unwrap_err();
    assert!(error.to_string().contains("financial_retainer_payments"));
}
