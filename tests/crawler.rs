mod common;

use common::*;
use pretty_assertions::assert_eq;
use statecrawl::prelude::*;

#[test]
fn move_with_string_follows_the_cheapest_path() {
    let mut smc = crawler();
    smc.move_to("InitialState").unwrap();
    smc.move_to("StateFour").unwrap();

    // EntryPoint -> Init -> S1 -> S2 -> V2 -> S4, total cost 4
    assert_eq!(smc.state(), STATE_FOUR);
    assert_eq!(smc.sut().calls("enter"), 1);
    assert_eq!(smc.sut().calls("unique"), 3);
    assert_eq!(smc.sut().calls("non_unique"), 1);
}

#[test]
fn sequential_moves() {
    let mut smc = crawler();
    smc.move_to("InitialState").unwrap();
    assert_eq!(smc.state(), INITIAL_STATE);
    smc.move_to("StateOne").unwrap();
    assert_eq!(smc.state(), STATE_ONE);
    smc.move_to("StateTwo").unwrap();
    assert_eq!(smc.state(), STATE_TWO);
    smc.move_to("StateFour").unwrap();
    assert_eq!(smc.state(), STATE_FOUR);
}

#[test]
fn moving_back_goes_through_the_entry_point() {
    let mut smc = crawler();
    smc.move_to("InitialState").unwrap();
    smc.move_to("StateFour").unwrap();
    smc.move_to("StateTwo").unwrap();

    assert_eq!(smc.state(), STATE_TWO);
    // S4 has no way back but the escape edge, so init ran a second time
    assert_eq!(smc.sut().calls("enter"), 2);
}

#[test]
fn moving_to_the_current_state_replays_the_self_transition() {
    let mut smc = crawler();
    smc.move_to("StateOne").unwrap();
    assert_eq!(smc.sut().calls("reset"), 0);
    smc.move_to("StateOne").unwrap();
    assert_eq!(smc.sut().calls("reset"), 1);
}

#[test]
fn moving_to_the_current_state_without_a_self_loop_reverifies() {
    let mut smc = crawler();
    smc.move_to("StateTwo").unwrap();
    assert_eq!(smc.sut().calls("visited:StateTwo"), 1);
    smc.move_to("StateTwo").unwrap();
    assert_eq!(smc.state(), STATE_TWO);
    assert_eq!(smc.sut().calls("visited:StateTwo"), 2);
}

#[test]
fn entry_point_is_one_escape_step_away() {
    let mut smc = crawler();
    smc.move_to("StateFour").unwrap();
    let enter_calls = smc.sut().calls("enter");

    smc.move_to("EntryPoint").unwrap();
    assert_eq!(smc.state(), ENTRY_POINT);
    assert_eq!(smc.sut().calls("enter"), enter_calls);
}

#[test]
fn verify_all_states_visits_everything() {
    let mut smc = crawler();
    smc.move_to("InitialState").unwrap();
    smc.verify_all_states(None, true).unwrap();

    for name in [
        "InitialState",
        "StateOne",
        "StateTwo",
        "StateThreeVariantOne",
        "StateThreeVariantTwo",
        "StateFour",
    ] {
        assert!(
            smc.sut().calls(&format!("visited:{name}")) >= 1,
            "{name} was never verified"
        );
    }
}

#[test]
fn verify_all_states_honors_the_pattern() {
    let mut smc = crawler();
    smc.move_to("InitialState").unwrap();
    smc.verify_all_states(Some(".*StateOne"), true).unwrap();

    assert_eq!(smc.sut().calls("visited:InitialState"), 1);
    assert_eq!(smc.sut().calls("visited:StateOne"), 1);
    assert_eq!(smc.sut().calls("visited:StateTwo"), 0);
    assert_eq!(smc.sut().calls("visited:StateFour"), 0);
}

#[test]
fn ambiguous_names_are_rejected() {
    let mut smc = crawler();
    let err = smc.move_to("State").unwrap_err();
    assert!(matches!(err, CrawlerError::MultipleStates { .. }), "{err}");
}

#[test]
fn unknown_names_are_rejected() {
    let mut smc = crawler();
    let err = smc.move_to("FooBar").unwrap_err();
    assert!(matches!(err, CrawlerError::NonExistentState { .. }), "{err}");

    let err = smc.move_to("tests.cases.UnknownState").unwrap_err();
    assert!(matches!(err, CrawlerError::NonExistentState { .. }), "{err}");
}

#[test]
fn a_failing_entry_transition_makes_the_graph_unreachable() {
    let mut smc = crawler();
    smc.sut_mut().fail_on("enter");

    let err = smc.move_to("InitialState").unwrap_err();
    assert!(matches!(err, CrawlerError::Transition { .. }), "{err}");
    let message = err.to_string();
    assert!(message.contains("Move from state"), "{message}");
    assert!(message.contains("has failed: transition failure"), "{message}");

    let err = smc.move_to("StateOne").unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("There is no way to achieve state {STATE_ONE}")
    );
}

#[test]
fn a_failing_verification_is_classified_as_such() {
    let mut smc = crawler();
    smc.sut_mut().fail_on("ok");

    let err = smc.move_to("InitialState").unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Move from state {ENTRY_POINT} to state {INITIAL_STATE} has failed: verification failure"
        )
    );
    assert_eq!(smc.state(), ENTRY_POINT);
}

#[test]
fn verify_all_states_aggregates_unvisited_states() {
    let mut smc = crawler();
    smc.sut_mut().fail_on("last_verify");

    let err = smc.verify_all_states(None, false).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Failed to visit the following states: {STATE_FOUR}")
    );
}

#[test]
fn a_failed_verification_cascades_to_dependent_states() {
    let mut smc = crawler();
    smc.sut_mut().fail_on("visited:StateTwo");

    let err = smc.move_to("StateTwo").unwrap_err();
    assert!(err.to_string().contains("verification failure"), "{err}");

    // everything past StateTwo only had paths through it
    for target in ["StateThreeVariantOne", "StateThreeVariantTwo", "StateFour"] {
        let err = smc.move_to(target).unwrap_err();
        assert!(matches!(err, CrawlerError::UnreachableState { .. }), "{err}");
    }
    // StateOne is still fine
    smc.move_to("StateOne").unwrap();
    assert_eq!(smc.state(), STATE_ONE);
}

#[test]
fn clear_resets_exclusions_and_position() {
    let mut smc = crawler();
    smc.sut_mut().fail_on("visited:StateTwo");
    let _ = smc.move_to("StateTwo");
    assert!(matches!(
        smc.move_to("StateFour"),
        Err(CrawlerError::UnreachableState { .. })
    ));

    smc.clear();
    assert_eq!(smc.state(), ENTRY_POINT);
    let snapshot = smc.as_graph().unwrap();
    assert!(snapshot.nodes.values().all(|node| !node.failed));

    // the graph is live again once the SUT behaves
    let mut smc = crawler();
    smc.clear();
    smc.move_to("StateFour").unwrap();
    assert_eq!(smc.state(), STATE_FOUR);
}

#[test]
fn observers_see_every_status_change() {
    let mut smc = crawler();
    let cell = SnapshotCell::new();
    smc.set_on_state_change_handler(cell.observer());

    smc.move_to("StateOne").unwrap();
    let snapshot = cell.latest();
    assert_eq!(snapshot.current(), Some(STATE_ONE));
    assert!(snapshot.nodes[STATE_ONE].visited);
    assert!(snapshot.nodes[INITIAL_STATE].visited);
}

#[test]
fn transitions_without_endpoints_are_rejected_at_freeze() {
    let mut smc = StateMachineCrawler::new(MockSut::default(), "Solo");
    smc.register_state(
        State::new(MODULE, "Solo")
            .verify(|sut: &mut MockSut| sut.check("ok"))
            .transition(
                Transition::new("init", |sut: &mut MockSut| sut.invoke("enter"))
                    .source(StateRef::Entry),
            ),
    )
    .unwrap();
    smc.register_state(
        State::new(MODULE, "BadState")
            .verify(|sut: &mut MockSut| sut.check("ok"))
            .transition(Transition::new("move", |sut: &mut MockSut| sut.invoke("noop"))),
    )
    .unwrap();

    let err = smc.move_to("Solo").unwrap_err();
    assert_eq!(
        err.to_string(),
        "No target nor source state is defined for tests.cases.BadState.move"
    );
}

#[test]
fn the_initial_state_must_be_registered() {
    let mut smc = StateMachineCrawler::new(MockSut::default(), "Nope");
    smc.register_states(all_states()).unwrap();

    let err = smc.move_to("StateOne").unwrap_err();
    assert_eq!(err.to_string(), "Nope is not a registered state");
}

#[test]
fn the_initial_state_must_declare_an_entry_transition() {
    let mut smc = StateMachineCrawler::new(MockSut::default(), "StateOne");
    smc.register_states(all_states()).unwrap();

    let err = smc.move_to("StateOne").unwrap_err();
    assert!(matches!(err, CrawlerError::Declaration { .. }), "{err}");
}

#[test]
fn colliding_full_names_are_rejected() {
    let mut smc = crawler();
    let err = smc
        .register_state(State::new(MODULE, "StateOne").verify(|sut: &mut MockSut| sut.check("ok")))
        .unwrap_err();
    assert!(matches!(err, CrawlerError::Declaration { .. }), "{err}");

    // re-registering the very same declarations is a no-op
    let states = all_states();
    let mut smc = StateMachineCrawler::new(MockSut::default(), "InitialState");
    smc.register_states(states.clone()).unwrap();
    smc.register_states(states).unwrap();
    smc.move_to("StateFour").unwrap();
}

#[test]
fn exclusions_persist_across_successful_moves() {
    let mut smc = crawler();
    smc.sut_mut().fail_on("visited:StateTwo");
    let _ = smc.move_to("StateTwo");

    // exclusions persist across successful moves
    smc.move_to("StateOne").unwrap();
    assert!(matches!(
        smc.move_to("StateTwo"),
        Err(CrawlerError::UnreachableState { .. })
    ));
}
