use ndarray::ArrayView1;

/// Probability clamp so hard 0/1 predictions keep log-loss finite.
const PROB_EPS: f64 = 1e-15;

/// Binary log-loss against positive-class probabilities.
pub fn log_loss(labels: &[usize], p1: ArrayView1<f64>) -> f64 {
    debug_assert_eq!(labels.len(), p1.len());
    if labels.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for (&y, &p) in labels.iter().zip(p1.iter()) {
        let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
        total += if y == 1 { -p.ln() } else { -(1.0 - p).ln() };
    }
    total / labels.len() as f64
}

/// ROC AUC via the rank statistic, with tied probabilities assigned their
/// average rank. Returns 0.5 when only one class is present.
pub fn roc_auc(labels: &[usize], p1: ArrayView1<f64>) -> f64 {
    debug_assert_eq!(labels.len(), p1.len());

    let n_pos = labels.iter().filter(|&&y| y == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    // Sort indices by probability and assign average ranks to ties
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| p1[a].total_cmp(&p1[b]));

    let mut ranks = vec![0.0; labels.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && p1[order[j + 1]] == p1[order[i]] {
            j += 1;
        }
        // Ranks are 1-based
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y == 1)
        .map(|(_, &r)| r)
        .sum();

    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    u / (n_pos * n_neg) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_log_loss_perfect_predictions_near_zero() {
        let labels = vec![1, 0, 1, 0];
        let p1 = array![1.0, 0.0, 1.0, 0.0];
        let ll = log_loss(&labels, p1.view());
        assert!(ll < 1e-10);
    }

    #[test]
    fn test_log_loss_uninformative_predictions() {
        let labels = vec![1, 0];
        let p1 = array![0.5, 0.5];
        let ll = log_loss(&labels, p1.view());
        assert!((ll - 0.5f64.ln().abs()).abs() < 1e-12);
    }

    #[test]
    fn test_log_loss_finite_for_confident_mistake() {
        let labels = vec![1];
        let p1 = array![0.0];
        let ll = log_loss(&labels, p1.view());
        assert!(ll.is_finite());
        assert!(ll > 30.0);
    }

    #[test]
    fn test_auc_perfect_ranking() {
        let labels = vec![0, 0, 1, 1];
        let p1 = array![0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&labels, p1.view()), 1.0);
    }

    #[test]
    fn test_auc_inverted_ranking() {
        let labels = vec![1, 1, 0, 0];
        let p1 = array![0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&labels, p1.view()), 0.0);
    }

    #[test]
    fn test_auc_with_ties() {
        let labels = vec![0, 1, 0, 1];
        let p1 = array![0.5, 0.5, 0.5, 0.5];
        assert!((roc_auc(&labels, p1.view()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class_is_half() {
        let labels = vec![1, 1, 1];
        let p1 = array![0.2, 0.5, 0.9];
        assert_eq!(roc_auc(&labels, p1.view()), 0.5);
    }

    #[test]
    fn test_auc_known_value() {
        // One inversion out of four positive/negative pairs
        let labels = vec![0, 1, 1, 0];
        let p1 = array![0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc(&labels, p1.view()) - 0.5).abs() < 1e-12);
    }
}
