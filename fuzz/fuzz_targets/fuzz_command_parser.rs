#![no_main]
use libfuzzer_sys::fuzz_target;
use scent_core::protocol::{Command, parse_command};
use scent_core::{Recipe, Step};

fuzz_target!(|data: &str| {
    // Arbitrary inbound text must parse or be rejected, never panic.
    if let Ok(Command::Manufacture { steps, carrier_slot }) = parse_command(data) {
        let steps: Vec<Step> = steps.iter().map(|&(s, p)| Step::new(s, p)).collect();
        let carrier = carrier_slot.map(|s| Step::new(s, 30));
        if let Ok(recipe) = Recipe::new(steps, carrier, 20) {
            let _ = recipe.requirements();
        }
    }
});
