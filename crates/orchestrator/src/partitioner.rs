//! 按单节点连接上限把模拟用户数切分为Worker计划。

use flare_core::models::{NodePlan, Script};

/// 把 `total_simulated_users` 切成若干个不超过 `connection_limit_per_node` 的分片
///
/// 除最后一片外均为满额，最后一片为余数（整除时为满额），各片之和等于总数。
/// 总数为零或负数时不需要Worker，返回空列表。
/// 上限不是正数时视为不限容量，全部放在一个分片里。
pub fn partition(total_simulated_users: i64, connection_limit_per_node: i64) -> Vec<NodePlan> {
    if total_simulated_users <= 0 {
        return Vec::new();
    }

    if connection_limit_per_node <= 0 {
        return vec![NodePlan::new(total_simulated_users)];
    }

    let full_nodes = total_simulated_users / connection_limit_per_node;
    let remainder = total_simulated_users % connection_limit_per_node;

    let mut nodes = vec![NodePlan::new(connection_limit_per_node); full_nodes as usize];
    if remainder > 0 {
        nodes.push(NodePlan::new(remainder));
    }

    nodes
}

/// 按所有脚本的模拟用户总数计算应当收到的完成信号数
pub fn expected_worker_count(scripts: &[Script], connection_limit_per_node: i64) -> usize {
    let total: i64 = scripts.iter().map(|s| s.total_simulators).sum();
    partition(total, connection_limit_per_node).len()
}

/// 逐个脚本切分时实际需要创建的Worker数
pub fn planned_worker_count(scripts: &[Script], connection_limit_per_node: i64) -> usize {
    scripts
        .iter()
        .map(|s| partition(s.total_simulators, connection_limit_per_node).len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(plans: &[NodePlan]) -> Vec<i64> {
        plans.iter().map(|p| p.total_simulated_users).collect()
    }

    #[test]
    fn test_should_calculate_correct_amount_of_nodes() {
        assert_eq!(
            users(&partition(532, 100)),
            vec![100, 100, 100, 100, 100, 32]
        );
    }

    #[test]
    fn test_should_handle_negative_numbers() {
        assert!(partition(-10, 100).is_empty());
        assert!(partition(i64::MIN, 100).is_empty());
    }

    #[test]
    fn test_should_handle_zero_simulated_users() {
        assert!(partition(0, 100).is_empty());
    }

    #[test]
    fn test_should_handle_total_below_or_at_limit() {
        assert_eq!(users(&partition(6, 100)), vec![6]);
        assert_eq!(users(&partition(99, 100)), vec![99]);
        assert_eq!(users(&partition(100, 100)), vec![100]);
        assert_eq!(users(&partition(101, 100)), vec![100, 1]);
        assert_eq!(users(&partition(200, 100)), vec![100, 100]);
    }

    #[test]
    fn test_non_positive_limit_means_single_node() {
        assert_eq!(users(&partition(532, 0)), vec![532]);
        assert!(partition(0, 0).is_empty());
    }

    #[test]
    fn test_partition_properties() {
        for capacity in [1_i64, 3, 7, 100, 1000] {
            for total in 0_i64..=2500 {
                let plan = users(&partition(total, capacity));

                assert_eq!(plan.iter().sum::<i64>(), total, "U={total} C={capacity}");

                let expected_len = (total + capacity - 1) / capacity;
                assert_eq!(plan.len() as i64, expected_len, "U={total} C={capacity}");

                if let Some((last, rest)) = plan.split_last() {
                    assert!(rest.iter().all(|&n| n == capacity));
                    assert!(*last > 0 && *last <= capacity);
                }
            }
        }
    }

    #[test]
    fn test_worker_counts() {
        let script = |total: i64| Script {
            start: 0.0,
            timeout: 60.0,
            total_simulators: total,
            target: "ws://localhost".to_string(),
            retry_limit: 0,
            payloads: None,
            extra: Default::default(),
        };

        let scripts = vec![script(1000), script(1067)];
        assert_eq!(planned_worker_count(&scripts, 1000), 3);
        assert_eq!(expected_worker_count(&scripts, 1000), 3);

        // 逐脚本切分可能比按总数切分需要更多Worker
        let scripts = vec![script(500), script(500)];
        assert_eq!(planned_worker_count(&scripts, 1000), 2);
        assert_eq!(expected_worker_count(&scripts, 1000), 1);
    }
}
