//! Elman recurrent network with a dense head, trained by backpropagation
//! through time.
//!
//! ```text
//! h_t = tanh(Wx x_t + Wh h_{t-1} + bh)      (hidden units)
//! z   = relu(W1 h_T + b1)                   (dense units)
//! y   = w2 . z + b2
//! ```
//!
//! Parameters live in one flat vector so the optimizer sees a single slice.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-7;
const CLIP_NORM: f64 = 5.0;

/// Network shape and training schedule.
#[derive(Debug, Clone)]
pub(crate) struct RnnSpec {
    pub input: usize,
    pub hidden: usize,
    pub dense: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

/// Offsets of each parameter block in the flat vector.
#[derive(Debug, Clone, Copy)]
struct Layout {
    input: usize,
    hidden: usize,
    dense: usize,
}

impl Layout {
    fn wx(&self, k: usize, i: usize) -> usize {
        k * self.input + i
    }
    fn wh(&self, k: usize, m: usize) -> usize {
        self.hidden * self.input + k * self.hidden + m
    }
    fn bh(&self, k: usize) -> usize {
        self.hidden * (self.input + self.hidden) + k
    }
    fn w1(&self, j: usize, k: usize) -> usize {
        self.bh(self.hidden) + j * self.hidden + k
    }
    fn b1(&self, j: usize) -> usize {
        self.w1(self.dense, 0) + j
    }
    fn w2(&self, j: usize) -> usize {
        self.b1(self.dense) + j
    }
    fn b2(&self) -> usize {
        self.w2(self.dense)
    }
    fn len(&self) -> usize {
        self.b2() + 1
    }
}

/// Activations kept from the forward pass.
struct Trace {
    hidden: Vec<Vec<f64>>,
    dense_pre: Vec<f64>,
    dense: Vec<f64>,
    output: f64,
}

struct Adam {
    m: Vec<f64>,
    v: Vec<f64>,
    step: i32,
    learning_rate: f64,
}

impl Adam {
    fn new(len: usize, learning_rate: f64) -> Self {
        Self {
            m: vec![0.0; len],
            v: vec![0.0; len],
            step: 0,
            learning_rate,
        }
    }

    fn update(&mut self, theta: &mut [f64], grad: &[f64]) {
        self.step += 1;
        let c1 = 1.0 - BETA1.powi(self.step);
        let c2 = 1.0 - BETA2.powi(self.step);
        for (((p, g), m), v) in theta.iter_mut().zip(grad).zip(&mut self.m).zip(&mut self.v) {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            *p -= self.learning_rate * (*m / c1) / ((*v / c2).sqrt() + ADAM_EPSILON);
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Rnn {
    layout: Layout,
    theta: Vec<f64>,
}

impl Rnn {
    fn init(spec: &RnnSpec, rng: &mut StdRng) -> Self {
        let layout = Layout {
            input: spec.input,
            hidden: spec.hidden,
            dense: spec.dense,
        };
        let mut theta = vec![0.0; layout.len()];
        let mut glorot = |range: std::ops::Range<usize>, fan_in: usize, fan_out: usize| {
            let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
            for p in &mut theta[range] {
                *p = rng.gen_range(-limit..limit);
            }
        };
        glorot(layout.wx(0, 0)..layout.wh(0, 0), spec.input, spec.hidden);
        glorot(layout.wh(0, 0)..layout.bh(0), spec.hidden, spec.hidden);
        glorot(layout.w1(0, 0)..layout.b1(0), spec.hidden, spec.dense);
        glorot(layout.w2(0)..layout.b2(), spec.dense, 1);
        Self { layout, theta }
    }

    /// Fit on `(window, target)` pairs with mini-batch Adam on squared error.
    pub fn train(spec: &RnnSpec, windows: &[Vec<Vec<f64>>], targets: &[f64]) -> Self {
        let mut rng = StdRng::seed_from_u64(spec.seed);
        let mut net = Self::init(spec, &mut rng);
        let mut adam = Adam::new(net.theta.len(), spec.learning_rate);
        let mut order: Vec<usize> = (0..windows.len()).collect();

        for _ in 0..spec.epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(spec.batch_size.max(1)) {
                let mut grad = vec![0.0; net.theta.len()];
                for &i in batch {
                    let trace = net.forward(&windows[i]);
                    let d_output = 2.0 * (trace.output - targets[i]) / batch.len() as f64;
                    net.backward(&windows[i], &trace, d_output, &mut grad);
                }
                clip(&mut grad, CLIP_NORM);
                adam.update(&mut net.theta, &grad);
            }
        }
        net
    }

    pub fn predict(&self, window: &[Vec<f64>]) -> f64 {
        self.forward(window).output
    }

    fn forward(&self, window: &[Vec<f64>]) -> Trace {
        let (l, th) = (self.layout, &self.theta);
        let mut hidden = Vec::with_capacity(window.len() + 1);
        hidden.push(vec![0.0; l.hidden]);
        for x in window {
            let prev = &hidden[hidden.len() - 1];
            let next: Vec<f64> = (0..l.hidden)
                .map(|k| {
                    let input: f64 = (0..l.input).map(|i| th[l.wx(k, i)] * x[i]).sum();
                    let recurrent: f64 = (0..l.hidden).map(|m| th[l.wh(k, m)] * prev[m]).sum();
                    (th[l.bh(k)] + input + recurrent).tanh()
                })
                .collect();
            hidden.push(next);
        }

        let last = &hidden[window.len()];
        let dense_pre: Vec<f64> = (0..l.dense)
            .map(|j| th[l.b1(j)] + (0..l.hidden).map(|k| th[l.w1(j, k)] * last[k]).sum::<f64>())
            .collect();
        let dense: Vec<f64> = dense_pre.iter().map(|v| v.max(0.0)).collect();
        let output = th[l.b2()] + (0..l.dense).map(|j| th[l.w2(j)] * dense[j]).sum::<f64>();
        Trace {
            hidden,
            dense_pre,
            dense,
            output,
        }
    }

    fn backward(&self, window: &[Vec<f64>], trace: &Trace, d_output: f64, grad: &mut [f64]) {
        let (l, th) = (self.layout, &self.theta);
        let last = &trace.hidden[window.len()];

        grad[l.b2()] += d_output;
        let mut d_hidden = vec![0.0; l.hidden];
        for j in 0..l.dense {
            grad[l.w2(j)] += d_output * trace.dense[j];
            if trace.dense_pre[j] <= 0.0 {
                continue;
            }
            let d_dense = d_output * th[l.w2(j)];
            grad[l.b1(j)] += d_dense;
            for k in 0..l.hidden {
                grad[l.w1(j, k)] += d_dense * last[k];
                d_hidden[k] += d_dense * th[l.w1(j, k)];
            }
        }

        for t in (0..window.len()).rev() {
            let (h, prev, x) = (&trace.hidden[t + 1], &trace.hidden[t], &window[t]);
            let mut d_prev = vec![0.0; l.hidden];
            for k in 0..l.hidden {
                let d_act = d_hidden[k] * (1.0 - h[k] * h[k]);
                grad[l.bh(k)] += d_act;
                for i in 0..l.input {
                    grad[l.wx(k, i)] += d_act * x[i];
                }
                for m in 0..l.hidden {
                    grad[l.wh(k, m)] += d_act * prev[m];
                    d_prev[m] += d_act * th[l.wh(k, m)];
                }
            }
            d_hidden = d_prev;
        }
    }
}

fn clip(grad: &mut [f64], max_norm: f64) {
    let norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
    if norm > max_norm {
        let scale = max_norm / norm;
        grad.iter_mut().for_each(|g| *g *= scale);
    }
}
