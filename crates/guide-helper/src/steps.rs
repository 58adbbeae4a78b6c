//! Step list editing for guide authoring.
//!
//! Every mutation leaves `step_number` equal to position + 1, whatever the numbers were before.
use guide_common::model::{GuideStep, MoveDirection};

use crate::error::AppError;

/// Rewrites `step_number` from list position.
pub fn renumber(steps: &mut [GuideStep]) {
    for (i, step) in steps.iter_mut().enumerate() {
        step.step_number = i as u32 + 1;
    }
}

pub fn add_step(steps: &mut Vec<GuideStep>, mut step: GuideStep) {
    step.step_number = steps.len() as u32 + 1;
    steps.push(step);
}

/// Replaces the content of the step at `index`, keeping its number.
pub fn update_step(steps: &mut [GuideStep], index: usize, step: GuideStep) -> Result<(), AppError> {
    let slot = steps.get_mut(index).ok_or_else(|| out_of_range(index))?;
    *slot = GuideStep {
        step_number: slot.step_number,
        ..step
    };
    Ok(())
}

pub fn delete_step(steps: &mut Vec<GuideStep>, index: usize) -> Result<GuideStep, AppError> {
    if index >= steps.len() {
        return Err(out_of_range(index));
    }
    let removed = steps.remove(index);
    renumber(steps);
    Ok(removed)
}

/// Swaps the step at `index` with its neighbour. Moving past either end is a no-op and
/// returns `false`.
pub fn move_step(steps: &mut [GuideStep], index: usize, direction: MoveDirection) -> Result<bool, AppError> {
    if index >= steps.len() {
        return Err(out_of_range(index));
    }
    let target = match direction {
        MoveDirection::Up if index > 0 => index - 1,
        MoveDirection::Down if index + 1 < steps.len() => index + 1,
        _ => return Ok(false),
    };
    steps.swap(index, target);
    renumber(steps);
    Ok(true)
}

/// Converts a 1-based step number into a list index.
pub fn index_of(step_number: u32) -> Result<usize, AppError> {
    match step_number {
        0 => Err(AppError::Invalid("step numbers start at 1".to_string())),
        n => Ok(n as usize - 1),
    }
}

fn out_of_range(index: usize) -> AppError {
    AppError::Invalid(format!("no step number {}", index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(texts: &[&str]) -> Vec<GuideStep> {
        let mut steps: Vec<GuideStep> = texts
            .iter()
            .map(|t| GuideStep {
                text: t.to_string(),
                ..Default::default()
            })
            .collect();
        renumber(&mut steps);
        steps
    }

    fn texts(steps: &[GuideStep]) -> Vec<&str> {
        steps.iter().map(|s| s.text.as_str()).collect()
    }

    fn assert_contiguous(steps: &[GuideStep]) {
        let numbers: Vec<u32> = steps.iter().map(|s| s.step_number).collect();
        let expected: Vec<u32> = (1..=steps.len() as u32).collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn delete_middle_step_renumbers() {
        let mut list = steps(&["A", "B", "C"]);
        let removed = delete_step(&mut list, 1).expect("in range");

        assert_eq!(removed.text, "B");
        assert_eq!(texts(&list), vec!["A", "C"]);
        assert_contiguous(&list);
    }

    #[test]
    fn move_down_then_up_restores_order() {
        let mut list = steps(&["A", "B", "C"]);
        assert!(move_step(&mut list, 0, MoveDirection::Down).expect("in range"));
        assert_eq!(texts(&list), vec!["B", "A", "C"]);
        assert_contiguous(&list);

        assert!(move_step(&mut list, 1, MoveDirection::Up).expect("in range"));
        assert_eq!(texts(&list), vec!["A", "B", "C"]);
    }

    #[test]
    fn moving_past_the_ends_is_a_no_op() {
        let mut list = steps(&["A", "B"]);
        assert!(!move_step(&mut list, 0, MoveDirection::Up).expect("in range"));
        assert!(!move_step(&mut list, 1, MoveDirection::Down).expect("in range"));
        assert_eq!(texts(&list), vec!["A", "B"]);
    }

    #[test]
    fn step_ids_travel_with_their_step() {
        let mut list = steps(&["A", "B"]);
        list[0].id = Some("s-a".to_string());
        move_step(&mut list, 0, MoveDirection::Down).expect("in range");
        assert_eq!(list[1].id.as_deref(), Some("s-a"));
        assert_eq!(list[1].step_number, 2);
    }

    #[test]
    fn add_and_update_keep_numbering() {
        let mut list = steps(&["A"]);
        add_step(
            &mut list,
            GuideStep {
                step_number: 99,
                text: "B".to_string(),
                ..Default::default()
            },
        );
        update_step(
            &mut list,
            0,
            GuideStep {
                step_number: 7,
                text: "A2".to_string(),
                ..Default::default()
            },
        )
        .expect("in range");

        assert_eq!(texts(&list), vec!["A2", "B"]);
        assert_contiguous(&list);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut list = steps(&["A"]);
        assert!(matches!(delete_step(&mut list, 3), Err(AppError::Invalid(_))));
        assert!(matches!(move_step(&mut list, 1, MoveDirection::Up), Err(AppError::Invalid(_))));
        assert!(matches!(index_of(0), Err(AppError::Invalid(_))));
        assert_eq!(index_of(2).expect("valid"), 1);
    }
}
