#![cfg(feature = "rayon")]

use pillcascade::{
    CascadeConfig, CascadePipeline, Detector, DetectorConfig, InputTensor, Model, RgbView,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, thiserror::Error)]
#[error("unreachable")]
struct Never;

/// Emits boxes derived from the mean input value, so results depend on the pixels.
struct MeanDriven {
    num_classes: usize,
    num_boxes: usize,
}

impl Model for MeanDriven {
    type Error = Never;

    fn infer(&self, input: &InputTensor) -> Result<Vec<f32>, Never> {
        let values = input.data().as_f32().unwrap_or(&[]);
        let mean = values.iter().sum::<f32>() / values.len().max(1) as f32;
        let shift = (mean + 1.0) / 2.0;
        let n = self.num_boxes;
        let mut out = vec![0.0f32; (4 + self.num_classes) * n];
        for b in 0..n {
            let t = (b as f32 + shift) / (n as f32 + 1.0);
            out[b] = t;
            out[n + b] = 1.0 - t;
            out[2 * n + b] = 0.2 + 0.1 * shift;
            out[3 * n + b] = 0.3;
            for c in 0..self.num_classes {
                out[(4 + c) * n + b] = ((b + c) % 5) as f32 / 5.0 + 0.1 * shift;
            }
        }
        Ok(out)
    }
}

fn random_image(rng: &mut StdRng, width: usize, height: usize) -> Vec<u8> {
    (0..width * height * 3).map(|_| rng.random::<u8>()).collect()
}

#[test]
fn parallel_batch_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(2024);
    let sizes = [(64, 48), (32, 80), (100, 100), (17, 23), (90, 30), (48, 48)];
    let buffers: Vec<(Vec<u8>, usize, usize)> = sizes
        .iter()
        .map(|&(w, h)| (random_image(&mut rng, w, h), w, h))
        .collect();
    let images: Vec<RgbView<'_>> = buffers
        .iter()
        .map(|(data, w, h)| RgbView::from_slice(data, *w, *h).unwrap())
        .collect();

    let config = |num_classes| DetectorConfig {
        input_width: 16,
        input_height: 16,
        num_classes,
        num_boxes: 12,
        ..DetectorConfig::default()
    };
    let pipeline = CascadePipeline::new(
        Detector::new(
            MeanDriven {
                num_classes: 2,
                num_boxes: 12,
            },
            config(2),
        )
        .unwrap(),
        Detector::new(
            MeanDriven {
                num_classes: 1,
                num_boxes: 12,
            },
            config(1),
        )
        .unwrap(),
        CascadeConfig::default(),
    )
    .unwrap();

    let parallel = pipeline.run_batch(&images);
    let sequential = pipeline.run_batch_sequential(&images);
    assert_eq!(parallel.len(), sequential.len());
    for (p, s) in parallel.iter().zip(&sequential) {
        assert_eq!(p.as_ref().unwrap(), s.as_ref().unwrap());
    }
}
