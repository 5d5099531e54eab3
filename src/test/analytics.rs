use chrono::{Duration, Utc};
use rocket::http::Status;
use serde_json::json;

use crate::analytics::{
    EventProperties, FunnelEvent, FunnelStage, PageEvent, TrackingContext, WidgetEvent,
    WidgetEventType, platform_report, track_event, track_funnel_event, track_widget_event,
    user_report,
};
use crate::db::{list_events_since, list_funnel_events_since, list_widget_events_since};

use super::test_utils::{TestDbBuilder, get_json, login_admin, login_owner, post_json, setup_test_client};

fn an_hour_ago() -> chrono::NaiveDateTime {
    (Utc::now() - Duration::hours(1)).naive_utc()
}

#[rocket::async_test]
async fn test_ingest_endpoints_store_events() {
    let test_db = TestDbBuilder::new().owner("owner@example.com", None).build().await.unwrap();
    let owner_id = test_db.user_id("owner@example.com").unwrap();
    let (client, pool) = setup_test_client(test_db).await;

    let (status, body) = post_json(
        &client,
        "/api/analytics/events",
        json!({
            "userId": owner_id,
            "eventType": "page_view",
            "eventName": "Dashboard viewed",
            "properties": { "page": "dashboard" },
            "sessionId": "session_1_abc",
        }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["sessionId"], "session_1_abc");

    let (status, body) = post_json(
        &client,
        "/api/analytics/testimonials",
        json!({ "userId": owner_id, "eventType": "form_view" }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert!(body["data"]["sessionId"].as_str().unwrap().starts_with("session_"));

    let response = client
        .post("/api/analytics/widgets")
        .header(rocket::http::ContentType::JSON)
        .body(
            json!({
                "userId": owner_id,
                "eventType": "testimonial_click",
                "websiteDomain": "shop.example",
                "properties": { "testimonialId": "t-1" },
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.headers().get_one("Access-Control-Allow-Origin"), Some("*"));

    let events = list_events_since(&pool, &owner_id, an_hour_ago()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        EventProperties::from_stored(&events[0].properties).to_value(),
        json!({ "page": "dashboard" })
    );

    let funnel = list_funnel_events_since(&pool, &owner_id, an_hour_ago()).await.unwrap();
    assert_eq!(funnel.len(), 1);
    assert_eq!(funnel[0].event_type, "form_view");

    let widgets = list_widget_events_since(&pool, Some(&owner_id), an_hour_ago()).await.unwrap();
    assert_eq!(widgets.len(), 1);
    assert_eq!(widgets[0].website_domain.as_deref(), Some("shop.example"));
    assert!(matches!(
        EventProperties::from_stored(&widgets[0].properties),
        EventProperties::TestimonialClick(_)
    ));
}

#[rocket::async_test]
async fn test_ingest_rejects_bad_payloads() {
    let test_db = TestDbBuilder::new().build().await.unwrap();
    let (client, _) = setup_test_client(test_db).await;

    let (status, body) = post_json(
        &client,
        "/api/analytics/events",
        json!({ "userId": "u1", "eventType": "page_view" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Missing required fields");

    let (status, body) = post_json(
        &client,
        "/api/analytics/testimonials",
        json!({ "userId": "u1", "eventType": "form_abandon" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Invalid event type");

    let response = client.options("/api/analytics/widgets").dispatch().await;
    assert_eq!(response.status(), Status::NoContent);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Methods"),
        Some("POST, OPTIONS")
    );
}

async fn seed_funnel(pool: &sqlx::Pool<sqlx::Sqlite>, ctx: &TrackingContext, stage: FunnelStage, times: usize) {
    for _ in 0..times {
        let event = FunnelEvent {
            stage,
            testimonial_id: None,
            form_data: EventProperties::default(),
            referrer: None,
        };
        track_funnel_event(pool, ctx, &event).await.unwrap();
    }
}

async fn seed_widget(
    pool: &sqlx::Pool<sqlx::Sqlite>,
    ctx: &TrackingContext,
    event_type: WidgetEventType,
    domain: &str,
) {
    let event = WidgetEvent {
        event_type,
        widget_id: None,
        website_domain: Some(domain.to_string()),
        referrer: None,
        properties: EventProperties::default(),
    };
    track_widget_event(pool, ctx, &event).await.unwrap();
}

#[rocket::async_test]
async fn test_owner_dashboard_report() {
    let test_db = TestDbBuilder::new()
        .owner("owner@example.com", None)
        .testimonial("owner@example.com", "A", 5, true)
        .testimonial("owner@example.com", "B", 4, true)
        .testimonial("owner@example.com", "C", 1, false)
        .build()
        .await
        .unwrap();
    let owner_id = test_db.user_id("owner@example.com").unwrap();
    let ctx = TrackingContext::new(owner_id.clone(), None);

    seed_funnel(&test_db.pool, &ctx, FunnelStage::FormView, 4).await;
    seed_funnel(&test_db.pool, &ctx, FunnelStage::FormStart, 2).await;
    seed_funnel(&test_db.pool, &ctx, FunnelStage::FormSubmit, 1).await;
    seed_widget(&test_db.pool, &ctx, WidgetEventType::WidgetLoad, "a.example").await;
    seed_widget(&test_db.pool, &ctx, WidgetEventType::WidgetLoad, "b.example").await;
    seed_widget(&test_db.pool, &ctx, WidgetEventType::WidgetView, "a.example").await;

    let (client, _) = setup_test_client(test_db).await;

    let (status, _) = get_json(&client, "/api/analytics/dashboard").await;
    assert_eq!(status, Status::Unauthorized);

    login_owner(&client, "owner@example.com").await;
    let (status, body) = get_json(&client, "/api/analytics/dashboard?period=7").await;
    assert_eq!(status, Status::Ok);

    assert_eq!(body["period"], 7);
    assert_eq!(
        body["testimonials"],
        json!({ "total": 3, "approved": 2, "pending": 1, "averageRating": "4.5" })
    );
    assert_eq!(body["collection"]["formViews"], 4);
    assert!(body.get("funnel").is_none());
    assert_eq!(body["conversion"]["viewToStart"], "50.0");
    assert_eq!(body["conversion"]["startToSubmit"], "50.0");
    assert_eq!(body["conversion"]["submitToComplete"], "0.0");
    assert_eq!(body["widgets"]["loads"], 2);
    assert_eq!(body["widgets"]["uniqueDomains"], 2);

    let titles: Vec<&str> = body["insights"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec!["Great Conversion Rate", "No Widget Engagement", "Excellent Reviews"]
    );
}

#[tokio::test]
async fn test_platform_report() {
    let test_db = TestDbBuilder::new()
        .owner("owner@example.com", None)
        .owner("quiet@example.com", None)
        .testimonial("owner@example.com", "A", 5, true)
        .testimonial("owner@example.com", "B", 2, false)
        .build()
        .await
        .unwrap();
    let owner_id = test_db.user_id("owner@example.com").unwrap();
    let pool = test_db.pool;

    let ctx = TrackingContext::new(owner_id.clone(), None);
    for domain in ["b.example", "a.example", "a.example", "b.example"] {
        seed_widget(&pool, &ctx, WidgetEventType::WidgetLoad, domain).await;
    }
    track_event(
        &pool,
        &ctx,
        &PageEvent {
            event_type: "page_view".to_string(),
            event_name: "Home".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    // No mirrored profile for this id.
    track_event(
        &pool,
        &TrackingContext::new("nobody", None),
        &PageEvent {
            event_type: "page_view".to_string(),
            event_name: "Home".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let report = platform_report(&pool, 30, Utc::now().naive_utc()).await.unwrap();

    // Only owners who received a testimonial are mirrored.
    assert_eq!(report.total_users, 1);
    assert_eq!(report.total_testimonials, 2);
    assert_eq!(report.total_widget_loads, 4);
    assert_eq!(report.average_rating, "5.0");
    assert_eq!(report.conversion_rate, "50.0");

    let domains: Vec<(&str, usize)> = report
        .top_domains
        .iter()
        .map(|d| (d.domain.as_str(), d.count))
        .collect();
    assert_eq!(domains, vec![("b.example", 2), ("a.example", 2)]);

    assert_eq!(report.recent_activity.len(), 2);
    let users: Vec<&str> = report
        .recent_activity
        .iter()
        .map(|a| a.user_email.as_str())
        .collect();
    assert!(users.contains(&"owner@example.com"));
    assert!(users.contains(&"Unknown User"));

    let wire = serde_json::to_value(&report).unwrap();
    let entry = &wire["recentActivity"][0];
    for key in ["type", "user_email", "created_at", "properties"] {
        assert!(entry.get(key).is_some(), "activity entry lacks {}", key);
    }
    assert!(wire["growthStats"].get("usersThisMonth").is_some());

    assert_eq!(report.growth_stats.users_this_month, 1);
    assert_eq!(report.growth_stats.testimonials_this_month, 2);
    assert_eq!(report.growth_stats.growth_percentage, 0);
}

#[rocket::async_test]
async fn test_admin_analytics_endpoints() {
    let test_db = TestDbBuilder::new()
        .admin("admin@example.com")
        .owner("owner@example.com", None)
        .testimonial("owner@example.com", "A", 4, true)
        .build()
        .await
        .unwrap();
    let owner_id = test_db.user_id("owner@example.com").unwrap();
    let ctx = TrackingContext::new(owner_id.clone(), None);
    seed_funnel(&test_db.pool, &ctx, FunnelStage::FormView, 2).await;
    seed_widget(&test_db.pool, &ctx, WidgetEventType::WidgetLoad, "shop.example").await;

    let (client, pool) = setup_test_client(test_db).await;
    login_admin(&client, "admin@example.com").await;

    let (status, body) = get_json(&client, "/api/admin/analytics?period=7").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["period"], 7);
    assert_eq!(body["totalTestimonials"], 1);
    assert_eq!(body["topDomains"][0]["domain"], "shop.example");
    assert!(body["recentActivity"].as_array().unwrap().is_empty());

    let (status, body) = post_json(
        &client,
        "/api/admin/analytics",
        json!({ "userId": owner_id, "period": 14 }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["userId"], owner_id.as_str());
    assert_eq!(body["collection"]["formViews"], 2);
    assert_eq!(body["conversion"]["viewToStart"], "0.0");
    assert_eq!(body["widgets"]["domains"], json!(["shop.example"]));
    assert_eq!(body["timeline"].as_array().unwrap().len(), 3);

    let (status, body) = post_json(&client, "/api/admin/analytics", json!({ "period": 14 })).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Missing userId");

    let report = user_report(&pool, &owner_id, 14, Utc::now().naive_utc()).await.unwrap();
    assert_eq!(report.testimonials.average_rating, "4.0");
}
