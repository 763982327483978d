//! Tests for the textual representation of composers.
//!
//! Rendering lists the stages in declaration order (the reverse of execution
//! order) behind the family's type name, and must terminate with a fixed
//! placeholder when a stage's rendering recursively reaches the composer
//! being rendered.

use std::fmt;
use std::sync::{Arc, OnceLock};

use catena::composer::{AsyncComposer, Composer, RECURSION_PLACEHOLDER, SyncComposer};
use catena::stage::{Callable, Outcome, StageError, func};
use catena::steps;
use catena::value::Value;

fn append(letter: char) -> Arc<dyn Callable> {
    func(letter.to_string(), move |mut text: String| {
        text.push(letter);
        text
    })
}

// =============================================================================
// Format
// =============================================================================

#[test]
fn test_render_lists_stages_in_declaration_order() {
    let composer = Composer::new(steps![append('f'), append('g')]).unwrap();
    assert_eq!(format!("{composer}"), "Composer(f, g)");
}

#[test]
fn test_debug_matches_display() {
    let composer = Composer::new(steps![append('f'), append('g')]).unwrap();
    assert_eq!(format!("{composer:?}"), format!("{composer}"));
}

#[test]
fn test_each_family_renders_its_type_name() {
    let deferred = AsyncComposer::new(steps![append('f'), append('g')]).unwrap();
    assert_eq!(format!("{deferred}"), "AsyncComposer(f, g)");

    let immediate = SyncComposer::new(steps![append('f'), append('g')]).unwrap();
    assert_eq!(format!("{immediate}"), "SyncComposer(f, g)");
}

#[test]
fn test_single_stage_render_has_no_separator() {
    let composer = Composer::new(steps![append('f')]).unwrap();
    assert_eq!(format!("{composer}"), "Composer(f)");
}

#[test]
fn test_equal_sequences_render_identically() {
    let built_flat = Composer::new(steps![append('f'), append('g'), append('h')]).unwrap();
    let inner = Composer::new(steps![append('f'), append('g')]).unwrap();
    let built_nested = Composer::new(steps![inner, append('h')]).unwrap();
    assert_eq!(format!("{built_flat}"), format!("{built_nested}"));
}

#[test]
fn test_opaque_nested_composer_renders_inline() {
    let inner = SyncComposer::new(steps![append('f'), append('g')]).unwrap();
    let outer = Composer::new(steps![append('h'), inner]).unwrap();
    assert_eq!(format!("{outer}"), "Composer(h, SyncComposer(f, g))");
}

// =============================================================================
// Recursion guard
// =============================================================================

struct SelfReferential {
    composer: OnceLock<Composer>,
}

impl Callable for SelfReferential {
    fn call(&self, input: Value) -> Result<Outcome, StageError> {
        Ok(Outcome::Ready(input))
    }

    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.composer.get() {
            Some(composer) => write!(formatter, "{composer}"),
            None => formatter.write_str("unset"),
        }
    }
}

#[test]
fn test_self_referential_render_terminates_with_placeholder() {
    let stage = Arc::new(SelfReferential {
        composer: OnceLock::new(),
    });
    let erased: Arc<dyn Callable> = stage.clone();
    let composer = Composer::new(steps![erased]).unwrap();

    assert!(stage.composer.set(composer.clone()).is_ok());

    let rendered = format!("{composer}");
    assert_eq!(rendered, format!("Composer({RECURSION_PLACEHOLDER})"));
}

#[test]
fn test_rendering_recovers_after_recursion() {
    let stage = Arc::new(SelfReferential {
        composer: OnceLock::new(),
    });
    let erased: Arc<dyn Callable> = stage.clone();
    let composer = Composer::new(steps![erased]).unwrap();
    assert!(stage.composer.set(composer.clone()).is_ok());

    // The guard unwinds after every render, so repeated renders are stable.
    assert_eq!(format!("{composer}"), format!("{composer}"));
}

#[test]
fn test_shared_stage_arcs_do_not_trip_the_guard() {
    let f = append('f');
    let inner = SyncComposer::new(steps![f.clone()]).unwrap();
    let outer = Composer::new(steps![inner, f.clone()]).unwrap();

    // Both composers start with the same stage allocation; the guard keys on
    // the chain, not the stages, so nothing is cut off.
    assert_eq!(format!("{outer}"), "Composer(SyncComposer(f), f)");
}
