//! Shared fixtures: a recording SUT mock plus the state graph
//! `Init -> S1 -> S2 -> {V1 (cost 2), V2} -> S4` used across the
//! integration tests.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};

use anyhow::bail;
use statecrawl::prelude::*;

/// Records every call made against it; calls whose name was marked with
/// [`MockSut::fail_on`] return an error instead.
#[derive(Debug, Default)]
pub struct MockSut {
    calls: HashMap<String, usize>,
    failing: BTreeSet<String>,
}

impl MockSut {
    pub fn invoke(&mut self, op: &str) -> anyhow::Result<()> {
        *self.calls.entry(op.to_string()).or_insert(0) += 1;
        if self.failing.contains(op) {
            bail!("injected failure in {op}");
        }
        Ok(())
    }

    pub fn check(&mut self, op: &str) -> anyhow::Result<bool> {
        self.invoke(op)?;
        Ok(true)
    }

    pub fn fail_on(&mut self, op: &str) {
        self.failing.insert(op.to_string());
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.get(op).copied().unwrap_or(0)
    }
}

pub const MODULE: &str = "tests.cases";

pub const INITIAL_STATE: &str = "tests.cases.InitialState";
pub const STATE_ONE: &str = "tests.cases.StateOne";
pub const STATE_TWO: &str = "tests.cases.StateTwo";
pub const VARIANT_ONE: &str = "tests.cases.StateThreeVariantOne";
pub const VARIANT_TWO: &str = "tests.cases.StateThreeVariantTwo";
pub const STATE_FOUR: &str = "tests.cases.StateFour";

fn verify(name: &'static str, check: &'static str) -> impl Fn(&mut MockSut) -> anyhow::Result<bool>
{
    move |sut: &mut MockSut| {
        sut.invoke(&format!("visited:{name}"))?;
        sut.check(check)
    }
}

pub fn initial_state() -> State<MockSut> {
    State::new(MODULE, "InitialState")
        .verify(verify("InitialState", "ok"))
        .transition(Transition::new("init", |sut: &mut MockSut| sut.invoke("enter")).source(StateRef::Entry))
        .transition(
            Transition::new("from_initial_state", |sut: &mut MockSut| sut.invoke("unique"))
                .target(STATE_ONE),
        )
}

pub fn state_one() -> State<MockSut> {
    State::new(MODULE, "StateOne")
        .verify(verify("StateOne", "ok"))
        .transition(
            Transition::new("reset", |sut: &mut MockSut| sut.invoke("reset"))
                .target(StateRef::SelfState),
        )
        .transition(
            Transition::new("from_state_one", |sut: &mut MockSut| sut.invoke("unique"))
                .target(STATE_TWO),
        )
}

pub fn state_two() -> State<MockSut> {
    State::new(MODULE, "StateTwo")
        .verify(verify("StateTwo", "ok"))
        .transition(
            Transition::new("move", |sut: &mut MockSut| sut.invoke("unique"))
                .target(VARIANT_ONE)
                .cost(2),
        )
        .transition(
            Transition::new("from_state_two", |sut: &mut MockSut| sut.invoke("unique"))
                .target(VARIANT_TWO),
        )
}

pub fn variant_one() -> State<MockSut> {
    State::new(MODULE, "StateThreeVariantOne")
        .verify(verify("StateThreeVariantOne", "ok"))
        .transition(
            Transition::new("from_v1", |sut: &mut MockSut| sut.invoke("non_unique"))
                .target(STATE_FOUR),
        )
}

pub fn variant_two() -> State<MockSut> {
    State::new(MODULE, "StateThreeVariantTwo")
        .verify(verify("StateThreeVariantTwo", "ok"))
        .transition(
            Transition::new("from_v2", |sut: &mut MockSut| sut.invoke("non_unique"))
                .target(STATE_FOUR),
        )
}

pub fn state_four() -> State<MockSut> {
    State::new(MODULE, "StateFour").verify(verify("StateFour", "last_verify"))
}

pub fn all_states() -> Vec<State<MockSut>> {
    vec![
        initial_state(),
        state_one(),
        state_two(),
        variant_one(),
        variant_two(),
        state_four(),
    ]
}

pub fn crawler() -> StateMachineCrawler<MockSut> {
    let mut crawler = StateMachineCrawler::new(MockSut::default(), "InitialState");
    crawler.register_states(all_states()).unwrap();
    crawler
}

pub const TPL_MODULE: &str = "tests.tpl_cases";

/// Template states with symbolic endpoints, instantiated by collections.
pub fn tpl_state_one() -> State<MockSut> {
    State::new(TPL_MODULE, "TplStateOne")
        .verify(|sut: &mut MockSut| sut.check("ok"))
        .transition(
            Transition::new("from_root", |sut: &mut MockSut| sut.invoke("noop"))
                .source(INITIAL_STATE),
        )
        .transition(
            Transition::new("to_unknown_target", |sut: &mut MockSut| sut.invoke("noop"))
                .target(StateRef::symbol("unknown_target")),
        )
}

pub fn tpl_state_two() -> State<MockSut> {
    State::new(TPL_MODULE, "TplStateTwo")
        .verify(|sut: &mut MockSut| sut.check("ok"))
        .transition(
            Transition::new("from_one", |sut: &mut MockSut| sut.invoke("noop"))
                .source("tests.tpl_cases.TplStateOne"),
        )
        .transition(
            Transition::new("to_another_unknown_target", |sut: &mut MockSut| sut.invoke("noop"))
                .target(StateRef::symbol("another_unknown_target")),
        )
}

pub const NON_TPL_MODULE: &str = "tests.non_tpl_cases";

/// The same pair with concrete endpoints, the module-registration analogue.
pub fn non_tpl_states() -> Vec<State<MockSut>> {
    let one = State::new(NON_TPL_MODULE, "TplStateOne")
        .verify(|sut: &mut MockSut| sut.check("ok"))
        .transition(
            Transition::new("from_root", |sut: &mut MockSut| sut.invoke("noop"))
                .source(INITIAL_STATE),
        )
        .transition(
            Transition::new("to_unknown_target", |sut: &mut MockSut| sut.invoke("noop"))
                .target(STATE_ONE),
        );
    let two = State::new(NON_TPL_MODULE, "TplStateTwo")
        .verify(|sut: &mut MockSut| sut.check("ok"))
        .transition(
            Transition::new("from_one", |sut: &mut MockSut| sut.invoke("noop"))
                .source("tests.non_tpl_cases.TplStateOne"),
        )
        .transition(
            Transition::new("to_another_unknown_target", |sut: &mut MockSut| sut.invoke("noop"))
                .target(STATE_TWO),
        );
    vec![one, two]
}
