mod entry_test;
mod ordering_test;
mod task_test;
