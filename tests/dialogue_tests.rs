use anyhow::Result;

use game_deals_bot::bot::handle_text;
use game_deals_bot::dialogue::{
    extract_selection_id, is_back, parse_budget, parse_item_id, validate_genre, validate_name,
    Budget, StateTag,
};
use game_deals_bot::localization::t;
use game_deals_bot::state_store::{ConversationState, OfferedItem};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{context, item, MockGateway, MockTransport};

const USER: i64 = 7;

/// Integration test for search input validation
#[tokio::test]
async fn test_search_input_validation() -> Result<()> {
    assert!(validate_name("Portal 2").is_ok());
    assert!(validate_name("   ").is_err());

    assert!(validate_genre("RPG").is_ok());
    assert!(validate_genre("R").is_err());

    assert_eq!(parse_budget("0"), Ok(Budget::Free));
    assert_eq!(parse_budget("0.00001"), Ok(Budget::Free));
    assert_eq!(parse_budget("100"), Ok(Budget::UpTo(100.0)));
    assert_eq!(parse_budget("150"), Err("budget-too-high"));
    assert_eq!(parse_budget("19,99"), Ok(Budget::UpTo(19.99)));
    assert_eq!(parse_budget("abc"), Err("budget-invalid"));

    assert_eq!(parse_item_id(" 620 "), Ok(620));
    assert!(parse_item_id("6 20").is_err());

    Ok(())
}

/// Selection labels round-trip through the id extractor
#[tokio::test]
async fn test_offered_labels_are_selectable() -> Result<()> {
    let offered = OfferedItem::new(42, "Foo", Some(" – $19.99"));

    assert_eq!(extract_selection_id(&offered.label), Some(42));
    assert_eq!(extract_selection_id("Foo"), None);
    assert!(is_back("back", "⬅️ Back"));
    assert!(!is_back("Back", "⬅️ Back"));

    Ok(())
}

/// A second event of the same user waits until the first one is done
#[tokio::test]
async fn test_events_of_one_user_are_serialized() -> Result<()> {
    let gateway = MockGateway::new();
    let transport = MockTransport::new();
    let ctx = Arc::new(context(&gateway, &transport));
    gateway.with_search_results(vec![item(620, "Portal 2", 999)]);
    let gate = gateway.gate_searches();
    ctx.states
        .set(USER, Some(ConversationState::new(StateTag::WaitingForName)));

    let search = tokio::spawn({
        let ctx = Arc::clone(&ctx);
        async move { handle_text(&ctx, USER, "Portal").await }
    });
    while gateway.search_calls.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let back = tokio::spawn({
        let ctx = Arc::clone(&ctx);
        async move { handle_text(&ctx, USER, "back").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The search holds the user; "back" has not been handled yet
    assert!(!back.is_finished());
    assert_eq!(transport.texts_for(USER), vec![t("searching")]);
    assert_eq!(
        ctx.states.get(USER).map(|state| state.tag),
        Some(StateTag::WaitingForName)
    );
    // The placeholder only lives in the running event
    assert_eq!(
        ctx.states.get(USER).and_then(|state| state.retractable_message_id),
        None
    );

    gate.add_permits(1);
    search.await?;
    back.await?;

    let texts = transport.texts_for(USER);
    assert_eq!(texts.len(), 3);
    assert_eq!(texts[0], t("searching"));
    assert_eq!(texts[2], t("main-menu"));
    assert!(ctx.states.get(USER).is_none());
    assert_eq!(ctx.states.pending_count(), 0);

    Ok(())
}
