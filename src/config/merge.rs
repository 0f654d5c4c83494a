pub(super) mod merge_policy;
