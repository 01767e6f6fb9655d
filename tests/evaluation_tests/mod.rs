mod builtins_test;
