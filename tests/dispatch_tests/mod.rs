mod interruption_test;
