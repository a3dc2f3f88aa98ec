// Property tests for pipeline evaluation in both modes.

use lazy_pipeline::{PipelineConfig, PipelineError, Sequence};
use proptest::prelude::*;

fn small_pool() -> PipelineConfig {
    PipelineConfig::new(3, 4).unwrap()
}

proptest! {
    #[test]
    fn test_order_preserving_stages_keep_input_order(items: Vec<i32>, threshold: i32) {
        let out = Sequence::from_vec(items.clone())
            .pipeline()
            .filter(move |x| *x > threshold)
            .unwrap()
            .map(|x| x.wrapping_mul(2))
            .unwrap()
            .to_vec()
            .unwrap();

        let expected: Vec<i32> = items
            .into_iter()
            .filter(|x| *x > threshold)
            .map(|x| x.wrapping_mul(2))
            .collect();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn test_sort_is_total_and_stable(items in prop::collection::vec((0u8..8, any::<u16>()), 0..200)) {
        // Tag each pair with its input position; sort by the key alone
        let tagged: Vec<(u8, u16, usize)> = items
            .iter()
            .enumerate()
            .map(|(i, (k, v))| (*k, *v, i))
            .collect();

        let sorted = Sequence::from_vec(tagged)
            .pipeline()
            .sorted_by_key(|(k, _, _)| *k)
            .unwrap()
            .to_vec()
            .unwrap();

        prop_assert_eq!(sorted.len(), items.len());
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].0 <= pair[1].0);
            if pair[0].0 == pair[1].0 {
                prop_assert!(pair[0].2 < pair[1].2, "equal keys reordered: {:?}", pair);
            }
        }
    }

    #[test]
    fn test_associative_reduce_agrees_across_modes(items in prop::collection::vec(-1000i64..1000, 0..500)) {
        let sequential = Sequence::from_vec(items.clone())
            .pipeline()
            .reduce(|a, b| a + b)
            .unwrap();
        let concurrent = Sequence::from_vec(items.clone())
            .parallel_pipeline()
            .with_config(small_pool())
            .unwrap()
            .reduce(|a, b| a + b)
            .unwrap();

        prop_assert_eq!(sequential, concurrent);
        prop_assert_eq!(sequential.is_none(), items.is_empty());
    }

    #[test]
    fn test_concurrent_collect_is_a_permutation(items in prop::collection::vec(any::<u32>(), 0..300)) {
        let mut out = Sequence::from_vec(items.clone())
            .parallel_pipeline()
            .with_config(small_pool())
            .unwrap()
            .map(|x| x / 2)
            .unwrap()
            .to_vec()
            .unwrap();
        let mut expected: Vec<u32> = items.into_iter().map(|x| x / 2).collect();

        out.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn test_consumed_pipeline_rejects_everything(items: Vec<u8>, parallel: bool) {
        let base = Sequence::from_vec(items).pipeline();
        let view = if parallel { base.parallel().unwrap() } else { base.clone() };
        view.count().unwrap();

        prop_assert!(base.is_consumed());
        prop_assert!(matches!(base.count(), Err(PipelineError::Consumed)));
        prop_assert!(matches!(view.filter(|_| true), Err(PipelineError::Consumed)));
        prop_assert!(matches!(base.to_vec(), Err(PipelineError::Consumed)));
        prop_assert!(matches!(view.map_into(|b| b as u32), Err(PipelineError::Consumed)));
    }
}
