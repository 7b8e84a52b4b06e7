mod http_gateway_tests;
