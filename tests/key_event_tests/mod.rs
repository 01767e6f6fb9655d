mod deferral_test;
